//! Folding a committed transaction into the next store generation.
use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::error::{EntityType, KernelError, Result};
use crate::index::value_index::{collect_key, IndexKey};
use crate::txstate::counts::compute_delta;
use crate::txstate::view::ViewRef;
use crate::txstate::{PropertyChanges, TxState};
use crate::types::{RelationshipDirection, TypeId, NO_ID};

use super::records::{
    Adjacency, GroupRecord, LabelSet, NodeRecord, PropertyChain, RelationshipData,
    RelationshipRecord,
};
use super::{push_slot, slot_mut, StoreData};

/// What a commit wrote.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CommitSummary {
    /// Nodes created.
    pub nodes_created: usize,
    /// Nodes deleted.
    pub nodes_deleted: usize,
    /// Relationships created.
    pub relationships_created: usize,
    /// Relationships deleted.
    pub relationships_deleted: usize,
    /// Nodes converted from a single chain to per-type groups.
    pub nodes_densified: usize,
}

struct IndexUpdate {
    index: u32,
    node: i64,
    before: Option<IndexKey>,
    after: Option<IndexKey>,
}

/// Checks `tx` against `data`, the generation the commit would apply to.
///
/// Everything the transaction writes or deletes must still exist, every
/// endpoint of a created relationship must be live after the commit, and a
/// deleted node must not have gained relationships the transaction does not
/// also delete.
pub(crate) fn check_conflicts(data: &StoreData, tx: &TxState) -> Result<()> {
    let node_conflict = |id| Err(KernelError::conflict(EntityType::Node, id));
    let relationship_conflict = |id| Err(KernelError::conflict(EntityType::Relationship, id));

    for node in tx.deleted_nodes() {
        if data.node(*node).is_none() {
            return node_conflict(*node);
        }
        let mut attached = None;
        data.for_each_relationship(*node, |rel| {
            if attached.is_none() && !tx.relationship_is_deleted(rel) {
                attached = Some(rel);
            }
        });
        if let Some(rel) = attached {
            return relationship_conflict(rel);
        }
    }
    for (node, _) in tx.node_states() {
        if !tx.node_is_added(node) && data.node(node).is_none() {
            return node_conflict(node);
        }
    }
    for rel in tx.deleted_relationships() {
        if data.relationship(*rel).is_none() {
            return relationship_conflict(*rel);
        }
    }
    for (rel, state) in tx.relationship_states() {
        if state.created.is_none() && data.relationship(rel).is_none() {
            return relationship_conflict(rel);
        }
    }
    let live = |node: i64| {
        tx.node_is_added(node) || (data.node(node).is_some() && !tx.node_is_deleted(node))
    };
    for rel in tx.added_relationships() {
        let Some(created) = tx.created_relationship(*rel) else {
            continue;
        };
        for node in [created.source, created.target] {
            if !live(node) {
                return node_conflict(node);
            }
        }
    }
    Ok(())
}

pub(crate) fn apply_tx_state(
    data: &mut StoreData,
    tx: &TxState,
    dense_threshold: usize,
) -> CommitSummary {
    let (counts_delta, index_updates) = {
        let view = ViewRef {
            store: data,
            tx: Some(tx),
        };
        (compute_delta(view), collect_index_updates(view))
    };
    let mut summary = CommitSummary::default();

    for rel in tx.deleted_relationships() {
        let Some(record) = slot_mut(&mut data.relationships, *rel).take() else {
            continue;
        };
        detach(data, *rel, &record.data);
        free_chain(data, record.properties);
        summary.relationships_deleted += 1;
    }

    for node in tx.deleted_nodes() {
        let Some(record) = slot_mut(&mut data.nodes, *node).take() else {
            continue;
        };
        for label in &record.labels {
            if let Some(members) = data.label_index.get_mut(label) {
                members.remove(node);
            }
        }
        free_chain(data, record.properties);
        summary.nodes_deleted += 1;
    }

    for node in tx.added_nodes() {
        let mut labels = LabelSet::new();
        let mut record_props = NO_ID;
        if let Some(state) = tx.node_state(*node) {
            labels.extend(state.labels.added().iter().copied());
            apply_properties(&mut data.properties, &mut record_props, &state.properties);
        }
        for label in &labels {
            data.label_index.entry(*label).or_default().insert(*node);
        }
        let mut record = NodeRecord::new(labels);
        record.properties = record_props;
        *slot_mut(&mut data.nodes, *node) = Some(record);
        summary.nodes_created += 1;
    }

    for (node, state) in tx.node_states() {
        if tx.node_is_added(node) {
            continue;
        }
        let Some(record) = node_mut(&mut data.nodes, node) else {
            continue;
        };
        record.labels.retain(|l| !state.labels.is_removed(*l));
        record.labels.extend(state.labels.added().iter().copied());
        record.labels.sort_unstable();
        record.labels.dedup();
        apply_properties(&mut data.properties, &mut record.properties, &state.properties);
        for label in state.labels.removed() {
            if let Some(members) = data.label_index.get_mut(label) {
                members.remove(&node);
            }
        }
        for label in state.labels.added() {
            data.label_index.entry(*label).or_default().insert(node);
        }
    }

    let mut grown: FxHashSet<i64> = FxHashSet::default();
    for rel in tx.added_relationships() {
        let Some(rel_data) = tx.created_relationship(*rel) else {
            continue;
        };
        let mut properties = NO_ID;
        if let Some(state) = tx.relationship_state(*rel) {
            apply_properties(&mut data.properties, &mut properties, &state.properties);
        }
        *slot_mut(&mut data.relationships, *rel) = Some(RelationshipRecord {
            data: rel_data,
            properties,
        });
        attach(data, *rel, &rel_data);
        grown.insert(rel_data.source);
        grown.insert(rel_data.target);
        summary.relationships_created += 1;
    }

    for (rel, state) in tx.relationship_states() {
        if state.created.is_some() {
            continue;
        }
        let slot = usize::try_from(rel)
            .ok()
            .and_then(|at| data.relationships.get_mut(at));
        if let Some(Some(record)) = slot {
            apply_properties(&mut data.properties, &mut record.properties, &state.properties);
        }
    }

    for node in grown {
        if densify(data, node, dense_threshold) {
            summary.nodes_densified += 1;
        }
    }

    data.counts.apply(&counts_delta);
    for update in index_updates {
        let Some(index) = data.value_indexes.get_mut(&update.index) else {
            continue;
        };
        if let Some(before) = &update.before {
            index.remove(update.node, before);
        }
        if let Some(after) = update.after {
            index.insert(update.node, after);
        }
    }
    summary
}

fn collect_index_updates(view: ViewRef<'_>) -> Vec<IndexUpdate> {
    let Some(tx) = view.tx else {
        return Vec::new();
    };
    let store = view.store;
    let mut candidates: Vec<i64> = tx
        .added_nodes()
        .iter()
        .chain(tx.deleted_nodes().iter())
        .copied()
        .chain(tx.node_states().map(|(id, _)| id))
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    let mut updates = Vec::new();
    for (id, index) in &store.value_indexes {
        for node in &candidates {
            let before = store
                .node(*node)
                .filter(|n| n.has_label(index.label()))
                .and_then(|n| collect_key(index.keys(), |k| store.property(n.properties, k)));
            let after = if view.node_exists(*node) && view.node_has_label(*node, index.label()) {
                collect_key(index.keys(), |k| view.node_property(*node, k))
            } else {
                None
            };
            let unchanged = match (&before, &after) {
                (None, None) => true,
                (Some(b), Some(a)) => b.iter().zip(a.iter()).all(|(x, y)| x.identical(y)),
                _ => false,
            };
            if !unchanged {
                updates.push(IndexUpdate {
                    index: *id,
                    node: *node,
                    before,
                    after,
                });
            }
        }
    }
    updates
}

fn node_mut(nodes: &mut [Option<NodeRecord>], id: i64) -> Option<&mut NodeRecord> {
    usize::try_from(id)
        .ok()
        .and_then(|at| nodes.get_mut(at))
        .and_then(Option::as_mut)
}

fn free_chain(data: &mut StoreData, chain: i64) {
    if chain >= 0 {
        slot_mut(&mut data.properties, chain).take();
    }
}

fn apply_properties(
    properties: &mut Vec<Option<PropertyChain>>,
    chain: &mut i64,
    changes: &PropertyChanges,
) {
    if changes.is_empty() {
        return;
    }
    if *chain < 0 {
        *chain = push_slot(properties, PropertyChain::default());
    }
    if let Some(entries) = slot_mut(properties, *chain).as_mut() {
        for key in changes.removed() {
            entries.remove(*key);
        }
        for (key, value) in changes.values() {
            entries.set(*key, value.clone());
        }
        if entries.is_empty() {
            slot_mut(properties, *chain).take();
            *chain = NO_ID;
        }
    }
}

fn endpoints(rel: &RelationshipData) -> SmallVec<[(i64, RelationshipDirection); 2]> {
    if rel.source == rel.target {
        smallvec::smallvec![(rel.source, RelationshipDirection::Loop)]
    } else {
        smallvec::smallvec![
            (rel.source, RelationshipDirection::Outgoing),
            (rel.target, RelationshipDirection::Incoming),
        ]
    }
}

fn first_group(data: &StoreData, node: i64) -> Option<Option<i64>> {
    data.node(node).map(|n| match n.adjacency {
        Adjacency::Dense { first_group } => Some(first_group),
        Adjacency::Sparse { .. } => None,
    })
}

fn detach(data: &mut StoreData, rel: i64, rel_data: &RelationshipData) {
    for (node, direction) in endpoints(rel_data) {
        match first_group(data, node) {
            None => {}
            Some(None) => {
                if let Some(NodeRecord {
                    adjacency: Adjacency::Sparse { chain },
                    ..
                }) = node_mut(&mut data.nodes, node)
                {
                    chain.retain(|r| *r != rel);
                }
            }
            Some(Some(first)) => {
                let Some((group, _)) = data.find_group(first, rel_data.ty) else {
                    continue;
                };
                let emptied = match slot_mut(&mut data.groups, group).as_mut() {
                    Some(record) => {
                        record.chain_mut(direction).retain(|r| *r != rel);
                        record.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    unlink_group(data, node, first, group);
                }
            }
        }
    }
}

/// Removes `group` from the group chain of `node` and frees its slot.
fn unlink_group(data: &mut StoreData, node: i64, first: i64, group: i64) {
    let Some(next) = data.group(group).map(|g| g.next) else {
        return;
    };
    if first == group {
        if let Some(record) = node_mut(&mut data.nodes, node) {
            record.adjacency = Adjacency::Dense { first_group: next };
        }
    } else {
        let mut previous = first;
        loop {
            match data.group(previous) {
                Some(g) if g.next == group => break,
                Some(g) => previous = g.next,
                None => return,
            }
        }
        if let Some(record) = slot_mut(&mut data.groups, previous).as_mut() {
            record.next = next;
        }
    }
    slot_mut(&mut data.groups, group).take();
}

fn attach(data: &mut StoreData, rel: i64, rel_data: &RelationshipData) {
    for (node, direction) in endpoints(rel_data) {
        match first_group(data, node) {
            None => {}
            Some(None) => {
                if let Some(NodeRecord {
                    adjacency: Adjacency::Sparse { chain },
                    ..
                }) = node_mut(&mut data.nodes, node)
                {
                    chain.push(rel);
                }
            }
            Some(Some(first)) => {
                let found = data.find_group(first, rel_data.ty).map(|(group, _)| group);
                let group = match found {
                    Some(group) => group,
                    None => {
                        let record = GroupRecord::new(rel_data.ty, first);
                        let group = push_slot(&mut data.groups, record);
                        if let Some(record) = node_mut(&mut data.nodes, node) {
                            record.adjacency = Adjacency::Dense { first_group: group };
                        }
                        group
                    }
                };
                if let Some(group) = slot_mut(&mut data.groups, group).as_mut() {
                    group.chain_mut(direction).push(rel);
                }
            }
        }
    }
}

/// Converts a sparse node whose chain reached `threshold` into groups.
fn densify(data: &mut StoreData, node: i64, threshold: usize) -> bool {
    let chain = match node_mut(&mut data.nodes, node) {
        Some(NodeRecord {
            adjacency: Adjacency::Sparse { chain },
            ..
        }) if chain.len() >= threshold => std::mem::take(chain),
        _ => return false,
    };
    let mut groups: BTreeMap<TypeId, GroupRecord> = BTreeMap::new();
    for rel in chain {
        let Some(record) = data.relationship(rel) else {
            continue;
        };
        let Some(direction) = record.data.direction_from(node) else {
            continue;
        };
        groups
            .entry(record.data.ty)
            .or_insert_with(|| GroupRecord::new(record.data.ty, NO_ID))
            .chain_mut(direction)
            .push(rel);
    }
    let mut next = NO_ID;
    for (_, mut group) in groups.into_iter().rev() {
        group.next = next;
        next = push_slot(&mut data.groups, group);
    }
    if let Some(record) = node_mut(&mut data.nodes, node) {
        record.adjacency = Adjacency::Dense { first_group: next };
    }
    true
}
