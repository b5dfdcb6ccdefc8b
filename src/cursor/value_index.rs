use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::index::value_index::{collect_key, compare_keys, IndexKey, ValueIndex};
use crate::index::{IndexOrder, IndexQuery};
use crate::txstate::view::{ReadView, ViewRef};
use crate::types::PropertyKeyId;
use crate::values::Value;

use super::node::NodeCursor;
use super::{assert_positioned, Cursor, CursorState};

fn accepts(queries: &[IndexQuery], key: &[Value]) -> bool {
    queries.iter().zip(key).all(|(q, v)| q.accepts_value(v))
}

/// Whether the transaction changed anything the index entry of `node`
/// depends on.
fn touched(view: ViewRef<'_>, index: &ValueIndex, node: i64) -> bool {
    if view.node_is_deleted(node) {
        return true;
    }
    view.node_state(node).is_some_and(|state| {
        state.labels.is_added(index.label())
            || state.labels.is_removed(index.label())
            || state.properties.touches(index.keys())
    })
}

/// Nodes from a value index seek or scan.
///
/// Committed entries the transaction did not affect are read from the index;
/// nodes the transaction created, relabelled or whose indexed properties it
/// changed are re-evaluated against the merged view.
#[derive(Debug, Default)]
pub struct NodeValueIndexCursor {
    view: Option<ReadView>,
    state: CursorState,
    keys: SmallVec<[PropertyKeyId; 2]>,
    results: Vec<(i64, IndexKey)>,
    pos: usize,
    need_values: bool,
}

impl NodeValueIndexCursor {
    /// Creates an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// `queries` apply to the index keys position by position; an empty slice
    /// accepts every entry.
    pub(crate) fn init(
        &mut self,
        view: ReadView,
        index: u32,
        queries: &[IndexQuery],
        order: IndexOrder,
        need_values: bool,
    ) {
        self.results.clear();
        self.keys.clear();
        if let Some(index) = view.store().value_index(index) {
            self.keys.extend_from_slice(index.keys());
            Self::collect(view.as_ref(), index, queries, order, &mut self.results);
        }
        view.metrics().cursor_initialized("value_index");
        self.pos = 0;
        self.need_values = need_values;
        self.state = CursorState::Unpositioned;
        self.view = Some(view);
    }

    fn collect(
        view: ViewRef<'_>,
        index: &ValueIndex,
        queries: &[IndexQuery],
        order: IndexOrder,
        out: &mut Vec<(i64, IndexKey)>,
    ) {
        out.extend(
            index
                .seek(queries.first())
                .iter()
                .filter(|e| !touched(view, index, e.node))
                .filter(|e| accepts(queries, &e.values))
                .map(|e| (e.node, e.values.clone())),
        );
        let committed = out.len();
        if let Some(tx) = view.tx {
            for (node, _) in tx.node_states() {
                if !touched(view, index, node)
                    || !view.node_exists(node)
                    || !view.node_has_label(node, index.label())
                {
                    continue;
                }
                if let Some(key) = collect_key(index.keys(), |k| view.node_property(node, k)) {
                    if accepts(queries, &key) {
                        out.push((node, key));
                    }
                }
            }
        }
        let by_value = |a: &(i64, IndexKey), b: &(i64, IndexKey)| -> Ordering {
            compare_keys(&a.1, &b.1).then(a.0.cmp(&b.0))
        };
        match order {
            IndexOrder::None => out[committed..].sort_unstable_by_key(|(node, _)| *node),
            IndexOrder::Ascending => out.sort_by(by_value),
            IndexOrder::Descending => out.sort_by(|a, b| by_value(b, a)),
        }
    }

    fn current(&self) -> &(i64, IndexKey) {
        assert_positioned(self.state, "value index");
        &self.results[self.pos - 1]
    }

    /// Reference of the current node.
    pub fn node_reference(&self) -> i64 {
        self.current().0
    }

    /// Number of indexed keys.
    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Property key at `offset` in the index.
    pub fn property_key(&self, offset: usize) -> PropertyKeyId {
        self.keys[offset]
    }

    /// Whether the cursor was asked to return values.
    pub fn has_value(&self) -> bool {
        self.need_values
    }

    /// Value of the key at `offset` for the current node, if values were
    /// requested.
    pub fn property_value(&self, offset: usize) -> Option<&Value> {
        let (_, key) = self.current();
        if self.need_values {
            key.get(offset)
        } else {
            None
        }
    }

    /// Positions `cursor` on the current node.
    pub fn node(&self, cursor: &mut NodeCursor) {
        let node = self.current().0;
        if let Some(view) = &self.view {
            cursor.init_single(view.clone(), node);
        }
    }
}

impl Cursor for NodeValueIndexCursor {
    fn next(&mut self) -> bool {
        if self.view.is_some() && self.pos < self.results.len() {
            self.pos += 1;
            self.state = CursorState::Positioned;
            return true;
        }
        self.state = CursorState::Exhausted;
        self.view = None;
        false
    }

    fn close(&mut self) {
        self.view = None;
        self.keys.clear();
        self.results.clear();
        self.pos = 0;
        self.need_values = false;
        self.state = CursorState::Unpositioned;
    }

    fn state(&self) -> CursorState {
        self.state
    }
}
