//! Committed entity counts keyed by label and relationship type.
//!
//! Node counts are kept per label and for [`LabelId::ANY`]. Relationship
//! counts are kept per `(start label, type, end label)` where at most one of
//! the two labels is concrete; both sides labelled is not tracked.
use rustc_hash::FxHashMap;

use crate::types::{LabelId, TypeId};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct RelationshipCountKey {
    pub(crate) start: LabelId,
    pub(crate) ty: TypeId,
    pub(crate) end: LabelId,
}

/// Calls `f` with every node count key a node with `labels` contributes to.
pub(crate) fn node_count_keys(labels: &[LabelId], mut f: impl FnMut(LabelId)) {
    f(LabelId::ANY);
    for label in labels {
        f(*label);
    }
}

/// Calls `f` with every relationship count key a relationship contributes to.
pub(crate) fn relationship_count_keys(
    start_labels: &[LabelId],
    ty: TypeId,
    end_labels: &[LabelId],
    mut f: impl FnMut(RelationshipCountKey),
) {
    for ty in [TypeId::ANY, ty] {
        f(RelationshipCountKey {
            start: LabelId::ANY,
            ty,
            end: LabelId::ANY,
        });
        for start in start_labels {
            f(RelationshipCountKey {
                start: *start,
                ty,
                end: LabelId::ANY,
            });
        }
        for end in end_labels {
            f(RelationshipCountKey {
                start: LabelId::ANY,
                ty,
                end: *end,
            });
        }
    }
}

/// Signed count changes, either committed totals or a transaction's delta.
#[derive(Clone, Debug, Default)]
pub(crate) struct Counts {
    pub(crate) nodes: FxHashMap<LabelId, i64>,
    pub(crate) relationships: FxHashMap<RelationshipCountKey, i64>,
}

impl Counts {
    pub(crate) fn node(&self, label: LabelId) -> i64 {
        self.nodes.get(&label).copied().unwrap_or(0)
    }

    pub(crate) fn relationship(&self, key: RelationshipCountKey) -> i64 {
        self.relationships.get(&key).copied().unwrap_or(0)
    }

    pub(crate) fn add_node(&mut self, labels: &[LabelId], delta: i64) {
        node_count_keys(labels, |label| *self.nodes.entry(label).or_default() += delta);
    }

    pub(crate) fn add_relationship(
        &mut self,
        start_labels: &[LabelId],
        ty: TypeId,
        end_labels: &[LabelId],
        delta: i64,
    ) {
        relationship_count_keys(start_labels, ty, end_labels, |key| {
            *self.relationships.entry(key).or_default() += delta
        });
    }

    /// Folds `delta` into these counts, dropping keys that reach zero.
    pub(crate) fn apply(&mut self, delta: &Counts) {
        for (label, d) in &delta.nodes {
            let entry = self.nodes.entry(*label).or_default();
            *entry += d;
            if *entry == 0 {
                self.nodes.remove(label);
            }
        }
        for (key, d) in &delta.relationships {
            let entry = self.relationships.entry(*key).or_default();
            *entry += d;
            if *entry == 0 {
                self.relationships.remove(key);
            }
        }
    }
}
