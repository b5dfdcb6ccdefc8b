//! Committed data merged with a transaction's changes.
use std::sync::Arc;

use crate::metrics::KernelMetrics;
use crate::store::records::{LabelSet, NodeRecord, RelationshipData};
use crate::store::StoreData;
use crate::types::{is_reference, LabelId, PropertyKeyId};
use crate::values::Value;

use super::{NodeState, PropertyChanges, PropertyLookup, TxState};

/// Borrowed merge of committed storage and (optionally) transaction state.
#[derive(Copy, Clone)]
pub(crate) struct ViewRef<'a> {
    pub(crate) store: &'a StoreData,
    pub(crate) tx: Option<&'a TxState>,
}

impl<'a> ViewRef<'a> {
    pub(crate) fn node_state(&self, id: i64) -> Option<&'a NodeState> {
        self.tx.and_then(|tx| tx.node_state(id))
    }

    fn node_properties_state(&self, id: i64) -> Option<&'a PropertyChanges> {
        self.node_state(id).map(|s| &s.properties)
    }

    fn relationship_properties_state(&self, id: i64) -> Option<&'a PropertyChanges> {
        self.tx
            .and_then(|tx| tx.relationship_state(id))
            .map(|s| &s.properties)
    }

    pub(crate) fn node_is_added(&self, id: i64) -> bool {
        self.tx.is_some_and(|tx| tx.node_is_added(id))
    }

    pub(crate) fn node_is_deleted(&self, id: i64) -> bool {
        self.tx.is_some_and(|tx| tx.node_is_deleted(id))
    }

    pub(crate) fn relationship_is_added(&self, id: i64) -> bool {
        self.tx.is_some_and(|tx| tx.relationship_is_added(id))
    }

    pub(crate) fn relationship_is_deleted(&self, id: i64) -> bool {
        self.tx.is_some_and(|tx| tx.relationship_is_deleted(id))
    }

    /// Committed record of a node this view still sees.
    pub(crate) fn store_node(&self, id: i64) -> Option<&'a NodeRecord> {
        if self.node_is_deleted(id) {
            return None;
        }
        self.store.node(id)
    }

    pub(crate) fn node_exists(&self, id: i64) -> bool {
        is_reference(id) && (self.node_is_added(id) || self.store_node(id).is_some())
    }

    pub(crate) fn relationship(&self, id: i64) -> Option<RelationshipData> {
        if !is_reference(id) {
            return None;
        }
        if let Some(created) = self.tx.and_then(|tx| tx.created_relationship(id)) {
            return Some(created);
        }
        if self.relationship_is_deleted(id) {
            return None;
        }
        self.store.relationship(id).map(|r| r.data)
    }

    pub(crate) fn relationship_exists(&self, id: i64) -> bool {
        self.relationship(id).is_some()
    }

    pub(crate) fn node_has_label(&self, id: i64, label: LabelId) -> bool {
        if let Some(state) = self.node_state(id) {
            if state.labels.is_added(label) {
                return true;
            }
            if state.labels.is_removed(label) {
                return false;
            }
        }
        self.store_node(id).is_some_and(|n| n.has_label(label))
    }

    /// Writes the merged, sorted labels of `id` into `out`.
    pub(crate) fn node_labels(&self, id: i64, out: &mut LabelSet) {
        out.clear();
        if let Some(node) = self.store_node(id) {
            out.extend_from_slice(&node.labels);
        }
        if let Some(state) = self.node_state(id) {
            out.retain(|l| !state.labels.is_removed(*l));
            out.extend(state.labels.added().iter().copied());
            out.sort_unstable();
            out.dedup();
        }
    }

    /// Committed property of a node, ignoring the transaction.
    pub(crate) fn store_node_property(&self, id: i64, key: PropertyKeyId) -> Option<&'a Value> {
        self.store_node(id)
            .and_then(|n| self.store.property(n.properties, key))
    }

    pub(crate) fn node_property(&self, id: i64, key: PropertyKeyId) -> Option<&'a Value> {
        match self.node_properties_state(id).map(|p| p.lookup(key)) {
            Some(PropertyLookup::Set(value)) => Some(value),
            Some(PropertyLookup::Removed) => None,
            _ => self.store_node_property(id, key),
        }
    }

    pub(crate) fn store_relationship_property(
        &self,
        id: i64,
        key: PropertyKeyId,
    ) -> Option<&'a Value> {
        if self.relationship_is_deleted(id) {
            return None;
        }
        self.store
            .relationship(id)
            .and_then(|r| self.store.property(r.properties, key))
    }

    pub(crate) fn relationship_property(&self, id: i64, key: PropertyKeyId) -> Option<&'a Value> {
        match self.relationship_properties_state(id).map(|p| p.lookup(key)) {
            Some(PropertyLookup::Set(value)) => Some(value),
            Some(PropertyLookup::Removed) => None,
            _ => self.store_relationship_property(id, key),
        }
    }

    pub(crate) fn node_has_properties(&self, id: i64) -> bool {
        let changes = self.node_properties_state(id);
        if changes.is_some_and(|c| !c.values().is_empty()) {
            return true;
        }
        let Some(node) = self.store_node(id) else {
            return false;
        };
        self.store
            .property_chain(node.properties)
            .iter()
            .any(|(k, _)| !changes.is_some_and(|c| c.removed().contains(k)))
    }

    pub(crate) fn relationship_has_properties(&self, id: i64) -> bool {
        let changes = self.relationship_properties_state(id);
        if changes.is_some_and(|c| !c.values().is_empty()) {
            return true;
        }
        if self.relationship_is_deleted(id) {
            return false;
        }
        let Some(rel) = self.store.relationship(id) else {
            return false;
        };
        self.store
            .property_chain(rel.properties)
            .iter()
            .any(|(k, _)| !changes.is_some_and(|c| c.removed().contains(k)))
    }

    /// Whether the node has any relationship this view sees.
    pub(crate) fn node_has_relationships(&self, id: i64) -> bool {
        if self
            .node_state(id)
            .is_some_and(|s| !s.added_relationships.is_empty())
        {
            return true;
        }
        if self.store_node(id).is_none() {
            return false;
        }
        let mut found = false;
        self.store.for_each_relationship(id, |rel| {
            found |= !self.relationship_is_deleted(rel);
        });
        found
    }
}

/// Shared snapshot a cursor reads through: committed storage plus, inside a
/// transaction, the transaction state as of cursor initialisation.
#[derive(Clone)]
pub struct ReadView {
    store: Arc<StoreData>,
    tx: Option<Arc<TxState>>,
    metrics: Arc<dyn KernelMetrics>,
}

impl ReadView {
    pub(crate) fn new(
        store: Arc<StoreData>,
        tx: Option<Arc<TxState>>,
        metrics: Arc<dyn KernelMetrics>,
    ) -> Self {
        Self { store, tx, metrics }
    }

    pub(crate) fn as_ref(&self) -> ViewRef<'_> {
        ViewRef {
            store: &self.store,
            tx: self.tx.as_deref(),
        }
    }

    pub(crate) fn store(&self) -> &StoreData {
        &self.store
    }

    pub(crate) fn tx(&self) -> Option<&TxState> {
        self.tx.as_deref()
    }

    pub(crate) fn metrics(&self) -> &dyn KernelMetrics {
        self.metrics.as_ref()
    }
}

impl std::fmt::Debug for ReadView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadView")
            .field("node_high_id", &self.store.node_high_id())
            .field("has_tx_state", &self.tx.is_some())
            .finish()
    }
}
