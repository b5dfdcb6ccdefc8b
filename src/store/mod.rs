//! Committed record storage.
//!
//! The committed state lives in one [`StoreData`] value behind an `Arc`.
//! Transactions pin the `Arc` they began with, so committed data a
//! transaction reads never changes underneath it; commit builds the next
//! generation and swaps it in under a write lock.

mod apply;
pub(crate) mod counts;
pub(crate) mod records;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::index::value_index::{collect_key, ValueIndex};
use crate::txstate::TxState;
use crate::types::{LabelId, PropertyKeyId, RelationshipDirection, TypeId};
use crate::values::Value;

pub use apply::CommitSummary;
use counts::Counts;
use records::{Adjacency, GroupRecord, NodeRecord, PropertyChain, RelationshipRecord};

/// One immutable generation of committed data.
#[derive(Clone, Debug, Default)]
pub(crate) struct StoreData {
    pub(crate) nodes: Vec<Option<NodeRecord>>,
    pub(crate) relationships: Vec<Option<RelationshipRecord>>,
    pub(crate) groups: Vec<Option<GroupRecord>>,
    pub(crate) properties: Vec<Option<PropertyChain>>,
    pub(crate) label_index: BTreeMap<LabelId, BTreeSet<i64>>,
    pub(crate) value_indexes: BTreeMap<u32, ValueIndex>,
    pub(crate) counts: Counts,
}

fn slot<T>(slots: &[Option<T>], id: i64) -> Option<&T> {
    usize::try_from(id).ok().and_then(|at| slots.get(at)).and_then(Option::as_ref)
}

impl StoreData {
    pub(crate) fn node(&self, id: i64) -> Option<&NodeRecord> {
        slot(&self.nodes, id)
    }

    pub(crate) fn relationship(&self, id: i64) -> Option<&RelationshipRecord> {
        slot(&self.relationships, id)
    }

    pub(crate) fn group(&self, id: i64) -> Option<&GroupRecord> {
        slot(&self.groups, id)
    }

    pub(crate) fn property_chain(&self, id: i64) -> &[(PropertyKeyId, Value)] {
        slot(&self.properties, id).map_or(&[], PropertyChain::entries)
    }

    pub(crate) fn property(&self, chain: i64, key: PropertyKeyId) -> Option<&Value> {
        slot(&self.properties, chain).and_then(|c| c.get(key))
    }

    /// One past the highest node slot ever committed.
    pub(crate) fn node_high_id(&self) -> i64 {
        self.nodes.len() as i64
    }

    /// One past the highest relationship slot ever committed.
    pub(crate) fn relationship_high_id(&self) -> i64 {
        self.relationships.len() as i64
    }

    pub(crate) fn nodes_with_label(&self, label: LabelId) -> Option<&BTreeSet<i64>> {
        self.label_index.get(&label)
    }

    pub(crate) fn value_index(&self, id: u32) -> Option<&ValueIndex> {
        self.value_indexes.get(&id)
    }

    /// Group of type `ty` in the chain starting at `first_group`.
    pub(crate) fn find_group(&self, first_group: i64, ty: TypeId) -> Option<(i64, &GroupRecord)> {
        let mut cursor = first_group;
        while let Some(group) = self.group(cursor) {
            if group.ty == ty {
                return Some((cursor, group));
            }
            cursor = group.next;
        }
        None
    }

    /// Visits every committed relationship incident to `node` once.
    pub(crate) fn for_each_relationship(&self, node: i64, mut f: impl FnMut(i64)) {
        let Some(record) = self.node(node) else {
            return;
        };
        match &record.adjacency {
            Adjacency::Sparse { chain } => chain.iter().copied().for_each(f),
            Adjacency::Dense { first_group } => {
                let mut cursor = *first_group;
                while let Some(group) = self.group(cursor) {
                    for direction in [
                        RelationshipDirection::Incoming,
                        RelationshipDirection::Loop,
                        RelationshipDirection::Outgoing,
                    ] {
                        group.chain(direction).iter().copied().for_each(&mut f);
                    }
                    cursor = group.next;
                }
            }
        }
    }

    fn populate_index(&self, index: &mut ValueIndex) {
        let Some(nodes) = self.label_index.get(&index.label()) else {
            return;
        };
        for node in nodes {
            let Some(record) = self.node(*node) else {
                continue;
            };
            let chain = record.properties;
            if let Some(key) = collect_key(index.keys(), |k| self.property(chain, k)) {
                index.insert(*node, key);
            }
        }
    }
}

/// Holder of the current committed generation.
pub(crate) struct RecordStorage {
    current: RwLock<Arc<StoreData>>,
    dense_threshold: usize,
}

impl RecordStorage {
    pub(crate) fn new(dense_threshold: usize) -> Self {
        Self {
            current: RwLock::new(Arc::new(StoreData::default())),
            dense_threshold,
        }
    }

    /// Current committed generation.
    pub(crate) fn snapshot(&self) -> Arc<StoreData> {
        Arc::clone(&self.current.read())
    }

    /// Applies a transaction's changes and publishes the next generation.
    ///
    /// Fails without touching the current generation when the changes
    /// conflict with a commit made since the transaction began.
    pub(crate) fn commit(&self, tx: &TxState) -> Result<CommitSummary> {
        let mut guard = self.current.write();
        apply::check_conflicts(&guard, tx)?;
        let data = Arc::make_mut(&mut *guard);
        Ok(apply::apply_tx_state(data, tx, self.dense_threshold))
    }

    /// Registers and populates a value index.
    pub(crate) fn create_index(&self, id: u32, label: LabelId, keys: &[PropertyKeyId]) {
        let mut guard = self.current.write();
        let data = Arc::make_mut(&mut *guard);
        let mut index = ValueIndex::new(label, keys);
        data.populate_index(&mut index);
        debug!(index = id, entries = index.entries().len(), "kernel.index.populate");
        data.value_indexes.insert(id, index);
    }
}

/// Ensures `slots` has room for `id` and returns the slot.
pub(crate) fn slot_mut<T>(slots: &mut Vec<Option<T>>, id: i64) -> &mut Option<T> {
    let at = usize::try_from(id).unwrap_or(0);
    if slots.len() <= at {
        slots.resize_with(at + 1, || None);
    }
    &mut slots[at]
}

/// Allocates a fresh slot at the end of `slots`.
pub(crate) fn push_slot<T>(slots: &mut Vec<Option<T>>, value: T) -> i64 {
    slots.push(Some(value));
    slots.len() as i64 - 1
}
