//! Count deltas implied by a transaction.
//!
//! For every entity the transaction touched, the delta is what the entity
//! contributes after the transaction minus what it contributed before. The
//! same computation feeds tx-aware count reads and commit.
use rustc_hash::FxHashSet;

use crate::store::counts::Counts;
use crate::store::records::LabelSet;

use super::view::ViewRef;

pub(crate) fn compute_delta(view: ViewRef<'_>) -> Counts {
    let mut delta = Counts::default();
    let Some(tx) = view.tx else {
        return delta;
    };
    let store = view.store;
    let mut after = LabelSet::new();
    let mut after_other = LabelSet::new();

    let relabelled: Vec<i64> = tx
        .node_states()
        .filter(|(_, s)| !s.labels.is_empty())
        .map(|(id, _)| id)
        .collect();

    let mut nodes: FxHashSet<i64> = FxHashSet::default();
    nodes.extend(tx.added_nodes().iter().copied());
    nodes.extend(tx.deleted_nodes().iter().copied());
    nodes.extend(relabelled.iter().copied());
    for node in &nodes {
        if let Some(record) = store.node(*node) {
            delta.add_node(&record.labels, -1);
        }
        if view.node_exists(*node) {
            view.node_labels(*node, &mut after);
            delta.add_node(&after, 1);
        }
    }

    let mut relationships: FxHashSet<i64> = FxHashSet::default();
    relationships.extend(tx.added_relationships().iter().copied());
    relationships.extend(tx.deleted_relationships().iter().copied());
    for node in &relabelled {
        if !tx.node_is_added(*node) {
            store.for_each_relationship(*node, |rel| {
                relationships.insert(rel);
            });
        }
    }
    let no_labels: &[_] = &[];
    for rel in &relationships {
        if let Some(record) = store.relationship(*rel) {
            let data = record.data;
            let start = store.node(data.source).map_or(no_labels, |n| &n.labels[..]);
            let end = store.node(data.target).map_or(no_labels, |n| &n.labels[..]);
            delta.add_relationship(start, data.ty, end, -1);
        }
        if let Some(data) = view.relationship(*rel) {
            view.node_labels(data.source, &mut after);
            view.node_labels(data.target, &mut after_other);
            delta.add_relationship(&after, data.ty, &after_other, 1);
        }
    }
    delta
}
