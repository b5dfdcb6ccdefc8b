use smallvec::SmallVec;

use crate::types::{LabelId, PropertyKeyId, RelationshipDirection, TypeId, NO_ID};
use crate::values::Value;

/// Sorted, duplicate-free label ids of one node.
pub(crate) type LabelSet = SmallVec<[LabelId; 4]>;

/// How a node's relationships are laid out.
#[derive(Clone, Debug)]
pub(crate) enum Adjacency {
    /// One chain holding every incident relationship.
    Sparse { chain: Vec<i64> },
    /// A linked list of per-type groups starting at `first_group`.
    Dense { first_group: i64 },
}

impl Default for Adjacency {
    fn default() -> Self {
        Adjacency::Sparse { chain: Vec::new() }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct NodeRecord {
    pub(crate) labels: LabelSet,
    pub(crate) properties: i64,
    pub(crate) adjacency: Adjacency,
}

impl NodeRecord {
    pub(crate) fn new(labels: LabelSet) -> Self {
        Self {
            labels,
            properties: NO_ID,
            adjacency: Adjacency::default(),
        }
    }

    pub(crate) fn has_label(&self, label: LabelId) -> bool {
        self.labels.binary_search(&label).is_ok()
    }

    pub(crate) fn is_dense(&self) -> bool {
        matches!(self.adjacency, Adjacency::Dense { .. })
    }
}

/// Type and endpoints of a relationship.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct RelationshipData {
    pub(crate) ty: TypeId,
    pub(crate) source: i64,
    pub(crate) target: i64,
}

impl RelationshipData {
    pub(crate) fn direction_from(&self, origin: i64) -> Option<RelationshipDirection> {
        RelationshipDirection::classify(origin, self.source, self.target)
    }

    /// Endpoint opposite `origin`; `origin` itself for loops.
    pub(crate) fn other(&self, origin: i64) -> i64 {
        if self.source == origin {
            self.target
        } else {
            self.source
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RelationshipRecord {
    pub(crate) data: RelationshipData,
    pub(crate) properties: i64,
}

/// Relationships of one type incident to a dense node.
#[derive(Clone, Debug)]
pub(crate) struct GroupRecord {
    pub(crate) ty: TypeId,
    pub(crate) next: i64,
    pub(crate) outgoing: Vec<i64>,
    pub(crate) incoming: Vec<i64>,
    pub(crate) loops: Vec<i64>,
}

impl GroupRecord {
    pub(crate) fn new(ty: TypeId, next: i64) -> Self {
        Self {
            ty,
            next,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            loops: Vec::new(),
        }
    }

    pub(crate) fn chain(&self, direction: RelationshipDirection) -> &[i64] {
        match direction {
            RelationshipDirection::Outgoing => &self.outgoing,
            RelationshipDirection::Incoming => &self.incoming,
            RelationshipDirection::Loop => &self.loops,
        }
    }

    pub(crate) fn chain_mut(&mut self, direction: RelationshipDirection) -> &mut Vec<i64> {
        match direction {
            RelationshipDirection::Outgoing => &mut self.outgoing,
            RelationshipDirection::Incoming => &mut self.incoming,
            RelationshipDirection::Loop => &mut self.loops,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty() && self.loops.is_empty()
    }
}

/// Property entries of one entity, sorted by key.
#[derive(Clone, Debug, Default)]
pub(crate) struct PropertyChain {
    entries: Vec<(PropertyKeyId, Value)>,
}

impl PropertyChain {
    pub(crate) fn entries(&self) -> &[(PropertyKeyId, Value)] {
        &self.entries
    }

    pub(crate) fn get(&self, key: PropertyKeyId) -> Option<&Value> {
        self.entries
            .binary_search_by_key(&key, |(k, _)| *k)
            .ok()
            .map(|at| &self.entries[at].1)
    }

    pub(crate) fn set(&mut self, key: PropertyKeyId, value: Value) {
        match self.entries.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(at) => self.entries[at].1 = value,
            Err(at) => self.entries.insert(at, (key, value)),
        }
    }

    pub(crate) fn remove(&mut self, key: PropertyKeyId) {
        if let Ok(at) = self.entries.binary_search_by_key(&key, |(k, _)| *k) {
            self.entries.remove(at);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
