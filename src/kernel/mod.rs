//! Kernel entry point: committed storage, tokens, schema and transactions.

mod read;
mod transaction;
mod write;

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::cursor::CursorFactory;
use crate::error::Result;
use crate::metrics::{default_metrics, KernelMetrics};
use crate::options::{KernelOptions, TxStateMode};
use crate::schema::{
    ConstraintDescriptor, ConstraintValidator, IndexReference, NoConstraints, SchemaRegistry,
};
use crate::store::RecordStorage;
use crate::token::TokenHolders;
use crate::types::{LabelId, PropertyKeyId};

pub use read::{DataRead, IndexQueryConstraints};
pub use transaction::{CommitOutcome, TerminationHandle, Transaction, TransactionStatus};
pub use write::DataWrite;

/// Identifier of a transaction, unique within one kernel.
pub type TxId = u64;

pub(crate) struct KernelInner {
    pub(crate) options: KernelOptions,
    pub(crate) storage: RecordStorage,
    pub(crate) tokens: TokenHolders,
    pub(crate) schema: SchemaRegistry,
    pub(crate) metrics: Arc<dyn KernelMetrics>,
    pub(crate) validator: Arc<dyn ConstraintValidator>,
    pub(crate) cursors: CursorFactory,
    next_node: AtomicI64,
    next_relationship: AtomicI64,
    next_tx: AtomicU64,
}

impl KernelInner {
    pub(crate) fn allocate_node_id(&self) -> i64 {
        self.next_node.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn allocate_relationship_id(&self) -> i64 {
        self.next_relationship.fetch_add(1, Ordering::Relaxed)
    }
}

/// In-memory graph kernel. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Kernel {
    /// Opens an empty kernel with `options`.
    pub fn open(options: KernelOptions) -> Result<Self> {
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        let validator = options
            .constraint_validator
            .clone()
            .unwrap_or_else(|| Arc::new(NoConstraints));
        info!(
            dense_node_threshold = options.dense_node_threshold,
            parallel_batch_size = options.parallel_batch_size,
            tx_state_mode = ?options.tx_state_mode,
            "kernel.open"
        );
        let storage = RecordStorage::new(options.dense_node_threshold);
        Ok(Self {
            inner: Arc::new(KernelInner {
                storage,
                tokens: TokenHolders::default(),
                schema: SchemaRegistry::default(),
                metrics,
                validator,
                cursors: CursorFactory::default(),
                next_node: AtomicI64::new(0),
                next_relationship: AtomicI64::new(0),
                next_tx: AtomicU64::new(1),
                options,
            }),
        })
    }

    /// Begins a transaction in the configured default mode.
    pub fn begin_transaction(&self) -> Result<Transaction> {
        self.begin_transaction_with(self.inner.options.tx_state_mode)
    }

    /// Begins a transaction in `mode`.
    pub fn begin_transaction_with(&self, mode: TxStateMode) -> Result<Transaction> {
        let id = self.inner.next_tx.fetch_add(1, Ordering::Relaxed);
        let store = self.inner.storage.snapshot();
        Ok(Transaction::new(Arc::clone(&self.inner), id, store, mode))
    }

    /// Token registries.
    pub fn tokens(&self) -> &TokenHolders {
        &self.inner.tokens
    }

    /// Index and constraint registry.
    pub fn schema(&self) -> &SchemaRegistry {
        &self.inner.schema
    }

    /// Creates a value index and populates it from committed data.
    ///
    /// Transactions begun before this call do not see the index.
    pub fn create_index(&self, label: LabelId, keys: &[PropertyKeyId]) -> Result<IndexReference> {
        let index = self.inner.schema.index_create(label, keys)?;
        self.inner.storage.create_index(index.id(), label, keys);
        info!(index = index.id(), label = label.0, keys = ?keys, "kernel.index.create");
        Ok(index)
    }

    /// Index over exactly `label` and `keys`.
    pub fn index_lookup(&self, label: LabelId, keys: &[PropertyKeyId]) -> Option<IndexReference> {
        self.inner.schema.index_lookup(label, keys)
    }

    /// Registers a constraint.
    pub fn create_constraint(&self, descriptor: ConstraintDescriptor) -> Result<()> {
        self.inner.schema.constraint_create(descriptor)
    }

    /// Whether `descriptor` is registered.
    pub fn constraint_exists(&self, descriptor: &ConstraintDescriptor) -> bool {
        self.inner.schema.constraint_exists(descriptor)
    }

    /// Shared cursor pools.
    pub fn cursors(&self) -> &CursorFactory {
        &self.inner.cursors
    }

    /// Options the kernel was opened with.
    pub fn options(&self) -> &KernelOptions {
        &self.inner.options
    }

    /// Metrics sink in use.
    pub fn metrics(&self) -> &Arc<dyn KernelMetrics> {
        &self.inner.metrics
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("options", &self.inner.options)
            .field("schema", &self.inner.schema)
            .finish()
    }
}
