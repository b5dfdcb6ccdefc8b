use std::collections::{BTreeMap, BTreeSet};

use crate::store::records::RelationshipData;
use crate::types::{LabelId, PropertyKeyId, RelationshipDirection, TypeId};
use crate::values::Value;

use super::diffsets::DiffSets;

/// Property writes of one entity: keys set in this transaction and committed
/// keys removed by it.
#[derive(Clone, Debug, Default)]
pub(crate) struct PropertyChanges {
    values: BTreeMap<PropertyKeyId, Value>,
    removed: BTreeSet<PropertyKeyId>,
}

/// Transaction view of one property key.
pub(crate) enum PropertyLookup<'a> {
    Set(&'a Value),
    Removed,
    Untouched,
}

impl PropertyChanges {
    /// `committed` is the value the key has in committed storage, if any.
    pub(crate) fn set(&mut self, key: PropertyKeyId, value: Value, committed: Option<&Value>) {
        self.removed.remove(&key);
        if committed.is_some_and(|c| c.identical(&value)) {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub(crate) fn remove(&mut self, key: PropertyKeyId, in_store: bool) {
        self.values.remove(&key);
        if in_store {
            self.removed.insert(key);
        }
    }

    pub(crate) fn lookup(&self, key: PropertyKeyId) -> PropertyLookup<'_> {
        if let Some(value) = self.values.get(&key) {
            PropertyLookup::Set(value)
        } else if self.removed.contains(&key) {
            PropertyLookup::Removed
        } else {
            PropertyLookup::Untouched
        }
    }

    /// Whether committed entries under `key` are hidden by this transaction.
    pub(crate) fn shadows(&self, key: PropertyKeyId) -> bool {
        self.values.contains_key(&key) || self.removed.contains(&key)
    }

    pub(crate) fn values(&self) -> &BTreeMap<PropertyKeyId, Value> {
        &self.values
    }

    pub(crate) fn removed(&self) -> &BTreeSet<PropertyKeyId> {
        &self.removed
    }

    pub(crate) fn touches(&self, keys: &[PropertyKeyId]) -> bool {
        keys.iter().any(|k| self.shadows(*k))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty() && self.removed.is_empty()
    }
}

/// Relationship ids of one type split by direction relative to a node.
#[derive(Clone, Debug, Default)]
pub(crate) struct DirectedIds {
    outgoing: Vec<i64>,
    incoming: Vec<i64>,
    loops: Vec<i64>,
}

impl DirectedIds {
    pub(crate) fn get(&self, direction: RelationshipDirection) -> &[i64] {
        match direction {
            RelationshipDirection::Outgoing => &self.outgoing,
            RelationshipDirection::Incoming => &self.incoming,
            RelationshipDirection::Loop => &self.loops,
        }
    }

    fn get_mut(&mut self, direction: RelationshipDirection) -> &mut Vec<i64> {
        match direction {
            RelationshipDirection::Outgoing => &mut self.outgoing,
            RelationshipDirection::Incoming => &mut self.incoming,
            RelationshipDirection::Loop => &mut self.loops,
        }
    }

    pub(crate) fn count(&self, direction: RelationshipDirection) -> usize {
        self.get(direction).len()
    }

    fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty() && self.loops.is_empty()
    }
}

/// Relationships incident to one node, grouped by type and direction.
#[derive(Clone, Debug, Default)]
pub(crate) struct RelationshipChanges {
    by_type: BTreeMap<TypeId, DirectedIds>,
}

impl RelationshipChanges {
    pub(crate) fn add(&mut self, ty: TypeId, direction: RelationshipDirection, id: i64) {
        self.by_type.entry(ty).or_default().get_mut(direction).push(id);
    }

    pub(crate) fn remove(&mut self, ty: TypeId, direction: RelationshipDirection, id: i64) -> bool {
        let Some(ids) = self.by_type.get_mut(&ty) else {
            return false;
        };
        let chain = ids.get_mut(direction);
        let before = chain.len();
        chain.retain(|r| *r != id);
        let removed = chain.len() != before;
        if ids.is_empty() {
            self.by_type.remove(&ty);
        }
        removed
    }

    pub(crate) fn count(&self, ty: TypeId, direction: RelationshipDirection) -> usize {
        self.by_type.get(&ty).map_or(0, |ids| ids.count(direction))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (TypeId, &DirectedIds)> {
        self.by_type.iter().map(|(ty, ids)| (*ty, ids))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Everything a transaction did to one node.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeState {
    pub(crate) labels: DiffSets<LabelId>,
    pub(crate) properties: PropertyChanges,
    pub(crate) added_relationships: RelationshipChanges,
    pub(crate) deleted_relationships: RelationshipChanges,
}

impl NodeState {
    pub(crate) fn is_empty(&self) -> bool {
        self.labels.is_empty()
            && self.properties.is_empty()
            && self.added_relationships.is_empty()
            && self.deleted_relationships.is_empty()
    }
}

/// Everything a transaction did to one relationship.
#[derive(Clone, Debug, Default)]
pub(crate) struct RelationshipState {
    /// Type and endpoints of a relationship created by the transaction.
    pub(crate) created: Option<RelationshipData>,
    pub(crate) properties: PropertyChanges,
}

impl RelationshipState {
    pub(crate) fn is_empty(&self) -> bool {
        self.created.is_none() && self.properties.is_empty()
    }
}
