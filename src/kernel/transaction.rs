use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{KernelError, Result};
use crate::metrics::KernelMetrics;
use crate::options::TxStateMode;
use crate::store::{CommitSummary, StoreData};
use crate::txstate::view::{ReadView, ViewRef};
use crate::txstate::TxState;

use super::read::DataRead;
use super::write::DataWrite;
use super::{KernelInner, TxId};

/// The state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is active and accepts operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back or closed without committing.
    RolledBack,
}

/// What a successful commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The transaction had no effective changes; storage was not touched.
    ReadOnly,
    /// Changes were applied to storage.
    Committed(CommitSummary),
}

/// Lets another thread terminate a transaction. Every later operation on the
/// transaction, including running parallel scans, fails with
/// [`KernelError::TransactionTerminated`].
#[derive(Clone)]
pub struct TerminationHandle {
    tx_id: TxId,
    flag: Arc<AtomicBool>,
    metrics: Arc<dyn KernelMetrics>,
}

impl TerminationHandle {
    /// Marks the transaction terminated. Returns `false` if it already was.
    pub fn terminate(&self) -> bool {
        let first = !self.flag.swap(true, Ordering::AcqRel);
        if first {
            self.metrics.tx_terminated();
            warn!(tx_id = self.tx_id, "kernel.tx.terminated");
        }
        first
    }

    /// Whether the transaction was terminated.
    pub fn is_terminated(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl std::fmt::Debug for TerminationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminationHandle")
            .field("tx_id", &self.tx_id)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// A unit of work over one committed snapshot.
///
/// Reads see the snapshot the transaction began with merged with the
/// transaction's own changes. Changes become visible to other transactions
/// only after [`Transaction::commit`]. Dropping an active transaction rolls
/// it back.
///
/// In [`TxStateMode::TwoLayer`] the transaction also keeps a stable
/// generation of its changes, frozen by [`Transaction::mark_as_stable`] and
/// read through [`Transaction::stable_data_read`].
pub struct Transaction {
    pub(crate) kernel: Arc<KernelInner>,
    id: TxId,
    pub(crate) store: Arc<StoreData>,
    pub(crate) state: Arc<TxState>,
    stable: Option<Arc<TxState>>,
    mode: TxStateMode,
    termination: TerminationHandle,
    status: TransactionStatus,
    start_time: Instant,
}

impl Transaction {
    pub(crate) fn new(
        kernel: Arc<KernelInner>,
        id: TxId,
        store: Arc<StoreData>,
        mode: TxStateMode,
    ) -> Self {
        let termination = TerminationHandle {
            tx_id: id,
            flag: Arc::new(AtomicBool::new(false)),
            metrics: Arc::clone(&kernel.metrics),
        };
        let state = Arc::new(TxState::default());
        let stable = match mode {
            TxStateMode::Single => None,
            TxStateMode::TwoLayer => Some(Arc::clone(&state)),
        };
        debug!(tx_id = id, mode = ?mode, node_high_id = store.node_high_id(), "kernel.tx.begin");
        Self {
            kernel,
            id,
            store,
            state,
            stable,
            mode,
            termination,
            status: TransactionStatus::Active,
            start_time: Instant::now(),
        }
    }

    /// Identifier of this transaction.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Current status.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// State mode chosen at begin.
    pub fn mode(&self) -> TxStateMode {
        self.mode
    }

    /// Handle for terminating this transaction from another thread.
    pub fn termination_handle(&self) -> TerminationHandle {
        self.termination.clone()
    }

    /// Whether the transaction has changes that a commit would write.
    pub fn has_data_changes(&self) -> bool {
        self.state.has_changes()
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.termination.is_terminated() {
            return Err(KernelError::TransactionTerminated);
        }
        if self.status != TransactionStatus::Active {
            return Err(KernelError::TransactionClosed);
        }
        Ok(())
    }

    pub(crate) fn view_ref(&self) -> ViewRef<'_> {
        ViewRef {
            store: &self.store,
            tx: Some(&self.state),
        }
    }

    pub(crate) fn read_view(&self, stable: bool) -> ReadView {
        let state = if stable {
            self.stable.as_ref().unwrap_or(&self.state)
        } else {
            &self.state
        };
        ReadView::new(
            Arc::clone(&self.store),
            Some(Arc::clone(state)),
            Arc::clone(&self.kernel.metrics),
        )
    }

    pub(crate) fn termination_flag(&self) -> Arc<AtomicBool> {
        self.termination.flag()
    }

    /// Reads that see every change made so far.
    pub fn data_read(&self) -> Result<DataRead<'_>> {
        self.ensure_active()?;
        Ok(DataRead::new(self, false))
    }

    /// Reads that see changes up to the last [`Self::mark_as_stable`] only.
    pub fn stable_data_read(&self) -> Result<DataRead<'_>> {
        self.ensure_active()?;
        if self.stable.is_none() {
            return Err(KernelError::Unsupported(
                "stable reads need a two-layer transaction",
            ));
        }
        Ok(DataRead::new(self, true))
    }

    /// Freezes the current changes as the stable generation.
    pub fn mark_as_stable(&mut self) -> Result<()> {
        self.ensure_active()?;
        match &mut self.stable {
            Some(stable) => {
                *stable = Arc::clone(&self.state);
                Ok(())
            }
            None => Err(KernelError::Unsupported(
                "mark_as_stable needs a two-layer transaction",
            )),
        }
    }

    /// Write operations.
    pub fn data_write(&mut self) -> Result<DataWrite<'_>> {
        self.ensure_active()?;
        Ok(DataWrite::new(self))
    }

    pub(crate) fn state_mut(&mut self) -> &mut TxState {
        Arc::make_mut(&mut self.state)
    }

    /// Applies the changes to storage.
    pub fn commit(mut self) -> Result<CommitOutcome> {
        if let Err(err) = self.ensure_active() {
            if self.status == TransactionStatus::Active {
                self.discard();
            }
            return Err(err);
        }
        if !self.state.has_changes() {
            self.status = TransactionStatus::Committed;
            self.kernel.metrics.tx_read_only();
            debug!(tx_id = self.id, "kernel.tx.commit.read_only");
            return Ok(CommitOutcome::ReadOnly);
        }
        let summary = match self.kernel.storage.commit(&self.state) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(tx_id = self.id, error = %err, "kernel.tx.commit.conflict");
                self.discard();
                return Err(err);
            }
        };
        self.status = TransactionStatus::Committed;
        self.kernel.metrics.tx_committed();
        info!(
            tx_id = self.id,
            nodes_created = summary.nodes_created,
            nodes_deleted = summary.nodes_deleted,
            relationships_created = summary.relationships_created,
            relationships_deleted = summary.relationships_deleted,
            nodes_densified = summary.nodes_densified,
            duration_us = self.start_time.elapsed().as_micros() as u64,
            "kernel.tx.commit"
        );
        Ok(CommitOutcome::Committed(summary))
    }

    /// Discards every change.
    pub fn rollback(mut self) -> Result<()> {
        if self.status != TransactionStatus::Active {
            return Err(KernelError::TransactionClosed);
        }
        self.discard();
        Ok(())
    }

    /// Ends the transaction, discarding changes if it is still active.
    pub fn close(mut self) {
        if self.status == TransactionStatus::Active {
            self.discard();
        }
    }

    fn discard(&mut self) {
        self.status = TransactionStatus::RolledBack;
        self.state = Arc::new(TxState::default());
        self.stable = None;
        self.kernel.metrics.tx_rolled_back();
        debug!(tx_id = self.id, "kernel.tx.rollback");
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Active {
            self.discard();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("terminated", &self.termination.is_terminated())
            .finish()
    }
}
