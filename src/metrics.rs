use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sink for kernel activity counters.
///
/// Implementations must be cheap: every cursor initialisation and every
/// relationship chain a traversal opens reports here.
pub trait KernelMetrics: Send + Sync {
    /// A transaction committed changes.
    fn tx_committed(&self);

    /// A transaction committed without changes.
    fn tx_read_only(&self);

    /// A transaction rolled back.
    fn tx_rolled_back(&self);

    /// A transaction was terminated from outside.
    fn tx_terminated(&self);

    /// A cursor was initialised.
    ///
    /// # Parameters
    /// * `kind` - Cursor kind: "node", "relationship", "traversal", "group",
    ///   "property", "label_index" or "value_index".
    fn cursor_initialized(&self, kind: &'static str);

    /// A traversal started reading one committed relationship chain.
    fn relationship_chain_opened(&self);

    /// A parallel scan handed out a batch of `size` positions.
    fn scan_batch_reserved(&self, size: u64);
}

/// A no-op implementation of [`KernelMetrics`] that discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl KernelMetrics for NoopMetrics {
    fn tx_committed(&self) {}
    fn tx_read_only(&self) {}
    fn tx_rolled_back(&self) {}
    fn tx_terminated(&self) {}
    fn cursor_initialized(&self, _kind: &'static str) {}
    fn relationship_chain_opened(&self) {}
    fn scan_batch_reserved(&self, _size: u64) {}
}

/// Atomic counter implementation of [`KernelMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Transactions that committed changes.
    pub tx_committed: AtomicU64,

    /// Transactions that committed without changes.
    pub tx_read_only: AtomicU64,

    /// Transactions rolled back.
    pub tx_rolled_back: AtomicU64,

    /// Transactions terminated from outside.
    pub tx_terminated: AtomicU64,

    /// Cursor initialisations of any kind.
    pub cursors_initialized: AtomicU64,

    /// Node scan and single-node cursor initialisations.
    pub node_cursors: AtomicU64,

    /// Relationship scan cursor initialisations.
    pub relationship_cursors: AtomicU64,

    /// Relationship traversal cursor initialisations.
    pub traversal_cursors: AtomicU64,

    /// Relationship group cursor initialisations.
    pub group_cursors: AtomicU64,

    /// Property cursor initialisations.
    pub property_cursors: AtomicU64,

    /// Label index cursor initialisations.
    pub label_index_cursors: AtomicU64,

    /// Value index cursor initialisations.
    pub value_index_cursors: AtomicU64,

    /// Committed relationship chains opened by traversals.
    pub relationship_chains_opened: AtomicU64,

    /// Parallel scan batches handed out.
    pub scan_batches: AtomicU64,

    /// Positions covered by handed-out scan batches.
    pub scan_positions: AtomicU64,
}

impl KernelMetrics for CounterMetrics {
    fn tx_committed(&self) {
        self.tx_committed.fetch_add(1, Ordering::Relaxed);
    }

    fn tx_read_only(&self) {
        self.tx_read_only.fetch_add(1, Ordering::Relaxed);
    }

    fn tx_rolled_back(&self) {
        self.tx_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    fn tx_terminated(&self) {
        self.tx_terminated.fetch_add(1, Ordering::Relaxed);
    }

    fn cursor_initialized(&self, kind: &'static str) {
        self.cursors_initialized.fetch_add(1, Ordering::Relaxed);
        let per_kind = match kind {
            "node" => &self.node_cursors,
            "relationship" => &self.relationship_cursors,
            "traversal" => &self.traversal_cursors,
            "group" => &self.group_cursors,
            "property" => &self.property_cursors,
            "label_index" => &self.label_index_cursors,
            "value_index" => &self.value_index_cursors,
            _ => return,
        };
        per_kind.fetch_add(1, Ordering::Relaxed);
    }

    fn relationship_chain_opened(&self) {
        self.relationship_chains_opened.fetch_add(1, Ordering::Relaxed);
    }

    fn scan_batch_reserved(&self, size: u64) {
        self.scan_batches.fetch_add(1, Ordering::Relaxed);
        self.scan_positions.fetch_add(size, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation, [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn KernelMetrics> {
    Arc::new(NoopMetrics)
}
