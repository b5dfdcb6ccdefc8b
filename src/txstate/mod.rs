//! Per-transaction mutation log and the merged read view over it.
//!
//! [`TxState`] records what a transaction created, deleted and modified. It is
//! held behind an `Arc` and written copy-on-write: cursors keep the `Arc` they
//! were initialised with, so a cursor sees the state as of its
//! initialisation, and the two-layer mode freezes an earlier generation simply
//! by keeping another `Arc` to it.

pub(crate) mod counts;
mod diffsets;
mod entity_state;
pub(crate) mod view;

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::store::records::RelationshipData;
use crate::types::{LabelId, PropertyKeyId, RelationshipDirection};
use crate::values::Value;

pub(crate) use entity_state::{NodeState, PropertyChanges, PropertyLookup, RelationshipState};
use diffsets::DiffSets;

#[derive(Clone, Debug, Default)]
pub(crate) struct TxState {
    nodes: DiffSets<i64>,
    relationships: DiffSets<i64>,
    node_states: FxHashMap<i64, NodeState>,
    relationship_states: FxHashMap<i64, RelationshipState>,
}

impl TxState {
    pub(crate) fn node_do_create(&mut self, id: i64) {
        self.nodes.add(id);
    }

    /// Deletes a node; a node created by this transaction leaves no trace.
    pub(crate) fn node_do_delete(&mut self, id: i64) {
        self.nodes.remove(id);
        self.node_states.remove(&id);
    }

    pub(crate) fn relationship_do_create(&mut self, id: i64, data: RelationshipData) {
        self.relationships.add(id);
        self.relationship_states.entry(id).or_default().created = Some(data);
        self.for_each_endpoint(&data, |state, direction| {
            state.added_relationships.add(data.ty, direction, id)
        });
    }

    /// Deletes a relationship; one created by this transaction is cancelled,
    /// a committed one is recorded against both endpoints' group deltas.
    pub(crate) fn relationship_do_delete(&mut self, id: i64, data: RelationshipData) {
        if self.relationships.is_added(id) {
            self.for_each_endpoint(&data, |state, direction| {
                state.added_relationships.remove(data.ty, direction, id);
            });
        } else {
            self.for_each_endpoint(&data, |state, direction| {
                state.deleted_relationships.add(data.ty, direction, id)
            });
        }
        self.relationships.remove(id);
        self.relationship_states.remove(&id);
        self.prune_node(data.source);
        self.prune_node(data.target);
    }

    fn for_each_endpoint(
        &mut self,
        data: &RelationshipData,
        mut f: impl FnMut(&mut NodeState, RelationshipDirection),
    ) {
        if data.source == data.target {
            f(self.node_state_mut(data.source), RelationshipDirection::Loop);
        } else {
            f(self.node_state_mut(data.source), RelationshipDirection::Outgoing);
            f(self.node_state_mut(data.target), RelationshipDirection::Incoming);
        }
    }

    pub(crate) fn node_do_add_label(&mut self, id: i64, label: LabelId) {
        self.node_state_mut(id).labels.add(label);
        self.prune_node(id);
    }

    pub(crate) fn node_do_remove_label(&mut self, id: i64, label: LabelId) {
        self.node_state_mut(id).labels.remove(label);
        self.prune_node(id);
    }

    pub(crate) fn node_do_set_property(
        &mut self,
        id: i64,
        key: PropertyKeyId,
        value: Value,
        committed: Option<&Value>,
    ) {
        self.node_state_mut(id).properties.set(key, value, committed);
        self.prune_node(id);
    }

    pub(crate) fn node_do_remove_property(&mut self, id: i64, key: PropertyKeyId, in_store: bool) {
        self.node_state_mut(id).properties.remove(key, in_store);
        self.prune_node(id);
    }

    pub(crate) fn relationship_do_set_property(
        &mut self,
        id: i64,
        key: PropertyKeyId,
        value: Value,
        committed: Option<&Value>,
    ) {
        self.relationship_states
            .entry(id)
            .or_default()
            .properties
            .set(key, value, committed);
        self.prune_relationship(id);
    }

    pub(crate) fn relationship_do_remove_property(
        &mut self,
        id: i64,
        key: PropertyKeyId,
        in_store: bool,
    ) {
        self.relationship_states
            .entry(id)
            .or_default()
            .properties
            .remove(key, in_store);
        self.prune_relationship(id);
    }

    fn node_state_mut(&mut self, id: i64) -> &mut NodeState {
        self.node_states.entry(id).or_default()
    }

    fn prune_node(&mut self, id: i64) {
        if self.node_states.get(&id).is_some_and(NodeState::is_empty) {
            self.node_states.remove(&id);
        }
    }

    fn prune_relationship(&mut self, id: i64) {
        if self
            .relationship_states
            .get(&id)
            .is_some_and(RelationshipState::is_empty)
        {
            self.relationship_states.remove(&id);
        }
    }

    pub(crate) fn node_is_added(&self, id: i64) -> bool {
        self.nodes.is_added(id)
    }

    pub(crate) fn node_is_deleted(&self, id: i64) -> bool {
        self.nodes.is_removed(id)
    }

    pub(crate) fn relationship_is_added(&self, id: i64) -> bool {
        self.relationships.is_added(id)
    }

    pub(crate) fn relationship_is_deleted(&self, id: i64) -> bool {
        self.relationships.is_removed(id)
    }

    pub(crate) fn added_nodes(&self) -> &BTreeSet<i64> {
        self.nodes.added()
    }

    pub(crate) fn deleted_nodes(&self) -> &BTreeSet<i64> {
        self.nodes.removed()
    }

    pub(crate) fn added_relationships(&self) -> &BTreeSet<i64> {
        self.relationships.added()
    }

    pub(crate) fn deleted_relationships(&self) -> &BTreeSet<i64> {
        self.relationships.removed()
    }

    pub(crate) fn node_state(&self, id: i64) -> Option<&NodeState> {
        self.node_states.get(&id)
    }

    pub(crate) fn relationship_state(&self, id: i64) -> Option<&RelationshipState> {
        self.relationship_states.get(&id)
    }

    pub(crate) fn node_states(&self) -> impl Iterator<Item = (i64, &NodeState)> {
        self.node_states.iter().map(|(id, state)| (*id, state))
    }

    pub(crate) fn relationship_states(&self) -> impl Iterator<Item = (i64, &RelationshipState)> {
        self.relationship_states.iter().map(|(id, state)| (*id, state))
    }

    pub(crate) fn created_relationship(&self, id: i64) -> Option<RelationshipData> {
        self.relationship_states.get(&id).and_then(|s| s.created)
    }

    /// Whether committing would change anything.
    pub(crate) fn has_changes(&self) -> bool {
        !self.nodes.is_empty()
            || !self.relationships.is_empty()
            || self.node_states.values().any(|s| !s.is_empty())
            || self.relationship_states.values().any(|s| !s.is_empty())
    }
}
