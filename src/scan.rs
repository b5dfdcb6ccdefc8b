//! Parallel batch scans.
//!
//! A [`Scan`] numbers every candidate entity once: positions
//! `0..store_high` are committed ids, the positions after them index the
//! ids the transaction had created when the scan began. Workers claim
//! disjoint position ranges with a single atomic cursor, so reservation never
//! blocks and never hands the same position out twice.
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::cursor::{Cursor, NodeCursor, RelationshipScanCursor};
use crate::error::{KernelError, Result};
use crate::txstate::view::ReadView;

/// Contiguous run of scan positions handed to one cursor.
#[derive(Clone, Debug)]
pub struct ScanBatch {
    next: u64,
    end: u64,
    store_high: i64,
    added: Arc<[i64]>,
}

impl Default for ScanBatch {
    fn default() -> Self {
        Self {
            next: 0,
            end: 0,
            store_high: 0,
            added: Arc::from(Vec::new()),
        }
    }
}

impl ScanBatch {
    /// Every position: the whole committed range then every added id.
    pub(crate) fn full(store_high: i64, added: Arc<[i64]>) -> Self {
        let end = store_high.max(0) as u64 + added.len() as u64;
        Self {
            next: 0,
            end,
            store_high,
            added,
        }
    }

    /// Candidate id at the next position, advancing past it.
    pub(crate) fn next_id(&mut self) -> Option<i64> {
        if self.next >= self.end {
            return None;
        }
        let position = self.next;
        self.next += 1;
        let store_high = self.store_high.max(0) as u64;
        if position < store_high {
            Some(position as i64)
        } else {
            self.added.get((position - store_high) as usize).copied()
        }
    }
}

mod sealed {
    use super::ScanBatch;
    use crate::txstate::view::ReadView;

    pub trait Sealed {
        fn init_batch(&mut self, view: ReadView, batch: ScanBatch);
    }
}

/// Cursor a [`Scan`] can hand batches to.
pub trait ScanCursor: Cursor + sealed::Sealed {}

impl sealed::Sealed for NodeCursor {
    fn init_batch(&mut self, view: ReadView, batch: ScanBatch) {
        NodeCursor::init_batch(self, view, batch);
    }
}

impl ScanCursor for NodeCursor {}

impl sealed::Sealed for RelationshipScanCursor {
    fn init_batch(&mut self, view: ReadView, batch: ScanBatch) {
        RelationshipScanCursor::init_batch(self, view, batch);
    }
}

impl ScanCursor for RelationshipScanCursor {}

/// Entity scan shared by worker threads, each reserving batches into its own
/// cursor.
pub struct Scan<C> {
    view: ReadView,
    store_high: i64,
    added: Arc<[i64]>,
    next: AtomicU64,
    total: u64,
    batch_size: usize,
    termination: Arc<AtomicBool>,
    _cursor: PhantomData<fn() -> C>,
}

impl<C: ScanCursor> Scan<C> {
    pub(crate) fn new(
        view: ReadView,
        store_high: i64,
        added: Vec<i64>,
        batch_size: usize,
        termination: Arc<AtomicBool>,
    ) -> Self {
        let added: Arc<[i64]> = Arc::from(added);
        let total = store_high.max(0) as u64 + added.len() as u64;
        Self {
            view,
            store_high,
            added,
            next: AtomicU64::new(0),
            total,
            batch_size: batch_size.max(1),
            termination,
            _cursor: PhantomData,
        }
    }

    /// Number of positions the scan covers, including positions whose entity
    /// turns out to be absent.
    pub fn total_positions(&self) -> u64 {
        self.total
    }

    /// Positions not yet handed out.
    pub fn remaining(&self) -> u64 {
        self.total
            .saturating_sub(self.next.load(Ordering::Acquire).min(self.total))
    }

    /// Claims up to `size_hint` unclaimed positions into `cursor`.
    ///
    /// Returns `Ok(false)` once every position has been handed out; the
    /// cursor is then left with an empty batch. A zero hint gives the cursor
    /// an empty batch without consuming anything and reports whether
    /// positions remain.
    pub fn reserve_batch(&self, cursor: &mut C, size_hint: usize) -> Result<bool> {
        if self.termination.load(Ordering::Acquire) {
            return Err(KernelError::TransactionTerminated);
        }
        if size_hint == 0 {
            cursor.init_batch(self.view.clone(), self.empty_batch());
            return Ok(self.remaining() > 0);
        }
        let wanted = size_hint as u64;
        let total = self.total;
        let claimed = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |start| {
                (start < total).then(|| start.saturating_add(wanted).min(total))
            });
        let Ok(start) = claimed else {
            cursor.init_batch(self.view.clone(), self.empty_batch());
            return Ok(false);
        };
        let end = start.saturating_add(wanted).min(total);
        self.view.metrics().scan_batch_reserved(end - start);
        debug!(start, end, "kernel.scan.batch");
        cursor.init_batch(
            self.view.clone(),
            ScanBatch {
                next: start,
                end,
                store_high: self.store_high,
                added: Arc::clone(&self.added),
            },
        );
        Ok(true)
    }

    /// Claims a batch of the configured default size.
    pub fn reserve_next(&self, cursor: &mut C) -> Result<bool> {
        self.reserve_batch(cursor, self.batch_size)
    }

    fn empty_batch(&self) -> ScanBatch {
        ScanBatch {
            next: 0,
            end: 0,
            store_high: self.store_high,
            added: Arc::clone(&self.added),
        }
    }
}

impl<C> std::fmt::Debug for Scan<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scan")
            .field("store_high", &self.store_high)
            .field("added", &self.added.len())
            .field("next", &self.next.load(Ordering::Relaxed))
            .field("total", &self.total)
            .finish()
    }
}
