use std::cmp::Ordering;

use smallvec::SmallVec;

use super::{IndexQuery, RangePredicate};
use crate::types::{LabelId, PropertyKeyId};
use crate::values::{compare_values, Value, ValueCategory};

/// Values of one node for the keys of a (possibly composite) index.
pub(crate) type IndexKey = SmallVec<[Value; 2]>;

/// One committed index entry.
#[derive(Clone, Debug)]
pub(crate) struct IndexEntry {
    pub(crate) values: IndexKey,
    pub(crate) node: i64,
}

/// Committed value index over nodes carrying `label`, kept sorted by
/// values then node id.
#[derive(Clone, Debug)]
pub(crate) struct ValueIndex {
    label: LabelId,
    keys: SmallVec<[PropertyKeyId; 2]>,
    entries: Vec<IndexEntry>,
}

pub(crate) fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    for (l, r) in a.iter().zip(b) {
        let ord = compare_values(l, r);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Collects the index key of an entity, or `None` if any key is missing.
pub(crate) fn collect_key<'v>(
    keys: &[PropertyKeyId],
    mut lookup: impl FnMut(PropertyKeyId) -> Option<&'v Value>,
) -> Option<IndexKey> {
    keys.iter().map(|k| lookup(*k).cloned()).collect()
}

/// Whether `value` sorts before every value `query` can accept.
fn below(query: &IndexQuery, value: &Value) -> bool {
    let category = value.category();
    match query {
        IndexQuery::Exists { .. } => false,
        IndexQuery::Exact { value: wanted, .. } => compare_values(value, wanted) == Ordering::Less,
        IndexQuery::Range { range, .. } => match range {
            RangePredicate::Bounded {
                category: wanted,
                from,
                from_inclusive,
                ..
            } => {
                category < *wanted
                    || (category == *wanted
                        && from.as_ref().is_some_and(|from| {
                            match compare_values(value, from) {
                                Ordering::Less => true,
                                Ordering::Equal => !from_inclusive,
                                Ordering::Greater => false,
                            }
                        }))
            }
            RangePredicate::Category(wanted) => category < *wanted,
            RangePredicate::Geometry { .. } | RangePredicate::Crs(_) => {
                category < ValueCategory::Geometry
            }
        },
        IndexQuery::StringPrefix { .. }
        | IndexQuery::StringSuffix { .. }
        | IndexQuery::StringContains { .. } => category < ValueCategory::Text,
    }
}

/// Whether `value` sorts after every value `query` can accept.
fn above(query: &IndexQuery, value: &Value) -> bool {
    let category = value.category();
    match query {
        IndexQuery::Exists { .. } => false,
        IndexQuery::Exact { value: wanted, .. } => {
            compare_values(value, wanted) == Ordering::Greater
        }
        IndexQuery::Range { range, .. } => match range {
            RangePredicate::Bounded {
                category: wanted,
                to,
                to_inclusive,
                ..
            } => {
                category > *wanted
                    || (category == *wanted
                        && to.as_ref().is_some_and(|to| match compare_values(value, to) {
                            Ordering::Greater => true,
                            Ordering::Equal => !to_inclusive,
                            Ordering::Less => false,
                        }))
            }
            RangePredicate::Category(wanted) => category > *wanted,
            RangePredicate::Geometry { .. } | RangePredicate::Crs(_) => {
                category > ValueCategory::Geometry
            }
        },
        IndexQuery::StringPrefix { .. }
        | IndexQuery::StringSuffix { .. }
        | IndexQuery::StringContains { .. } => category > ValueCategory::Text,
    }
}

impl ValueIndex {
    pub(crate) fn new(label: LabelId, keys: &[PropertyKeyId]) -> Self {
        Self {
            label,
            keys: SmallVec::from_slice(keys),
            entries: Vec::new(),
        }
    }

    pub(crate) fn label(&self) -> LabelId {
        self.label
    }

    pub(crate) fn keys(&self) -> &[PropertyKeyId] {
        &self.keys
    }

    pub(crate) fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Entries whose first value can satisfy `first`, located by binary
    /// search. Later keys of a composite index are not checked.
    pub(crate) fn seek(&self, first: Option<&IndexQuery>) -> &[IndexEntry] {
        let Some(query) = first else {
            return &self.entries;
        };
        let start = self
            .entries
            .partition_point(|e| e.values.first().is_some_and(|v| below(query, v)));
        let rest = &self.entries[start..];
        let end = rest.partition_point(|e| e.values.first().is_some_and(|v| !above(query, v)));
        &rest[..end]
    }

    fn position(&self, node: i64, values: &[Value]) -> std::result::Result<usize, usize> {
        self.entries
            .binary_search_by(|e| compare_keys(&e.values, values).then(e.node.cmp(&node)))
    }

    pub(crate) fn insert(&mut self, node: i64, values: IndexKey) {
        if let Err(at) = self.position(node, &values) {
            self.entries.insert(at, IndexEntry { values, node });
        }
    }

    pub(crate) fn remove(&mut self, node: i64, values: &[Value]) -> bool {
        match self.position(node, values) {
            Ok(at) => {
                self.entries.remove(at);
                true
            }
            Err(_) => false,
        }
    }
}
