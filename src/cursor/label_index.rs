use std::ops::Bound;

use crate::txstate::view::ReadView;
use crate::types::{LabelId, NO_ID};

use super::node::NodeCursor;
use super::{assert_positioned, Cursor, CursorState};

#[derive(Copy, Clone, Debug, Default)]
enum Phase {
    #[default]
    Done,
    Store(Bound<i64>),
    Tx(usize),
}

/// Nodes carrying one label.
///
/// Committed label-index entries come first in ascending id order, skipping
/// nodes the transaction deleted or removed the label from; nodes that gained
/// the label in the transaction follow in ascending id order.
#[derive(Debug, Default)]
pub struct NodeLabelIndexCursor {
    view: Option<ReadView>,
    state: CursorState,
    label: Option<LabelId>,
    phase: Phase,
    added: Vec<i64>,
    current: i64,
}

impl NodeLabelIndexCursor {
    /// Creates an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn init(&mut self, view: ReadView, label: LabelId) {
        self.added.clear();
        {
            let merged = view.as_ref();
            let committed = view.store().nodes_with_label(label);
            if let Some(tx) = view.tx() {
                self.added.extend(
                    tx.node_states()
                        .filter(|(_, state)| state.labels.is_added(label))
                        .map(|(id, _)| id)
                        .filter(|id| !committed.is_some_and(|set| set.contains(id)))
                        .filter(|id| merged.node_exists(*id)),
                );
                self.added.sort_unstable();
            }
        }
        view.metrics().cursor_initialized("label_index");
        self.label = Some(label);
        self.phase = Phase::Store(Bound::Unbounded);
        self.current = NO_ID;
        self.state = CursorState::Unpositioned;
        self.view = Some(view);
    }

    /// Reference of the current node.
    pub fn node_reference(&self) -> i64 {
        assert_positioned(self.state, "label index");
        self.current
    }

    /// Label this cursor scans.
    pub fn label(&self) -> Option<LabelId> {
        self.label
    }

    /// Positions `cursor` on the current node.
    pub fn node(&self, cursor: &mut NodeCursor) {
        assert_positioned(self.state, "label index");
        if let Some(view) = &self.view {
            cursor.init_single(view.clone(), self.current);
        }
    }
}

impl Cursor for NodeLabelIndexCursor {
    fn next(&mut self) -> bool {
        let found = match (&self.view, self.label) {
            (Some(view), Some(label)) => {
                let merged = view.as_ref();
                let mut found = None;
                while found.is_none() {
                    match self.phase {
                        Phase::Store(after) => {
                            let next = view.store().nodes_with_label(label).and_then(|set| {
                                set.range((after, Bound::Unbounded))
                                    .copied()
                                    .find(|id| merged.node_has_label(*id, label))
                            });
                            match next {
                                Some(id) => {
                                    self.phase = Phase::Store(Bound::Excluded(id));
                                    found = Some(id);
                                }
                                None => self.phase = Phase::Tx(0),
                            }
                        }
                        Phase::Tx(pos) => match self.added.get(pos) {
                            Some(id) => {
                                self.phase = Phase::Tx(pos + 1);
                                found = Some(*id);
                            }
                            None => {
                                self.phase = Phase::Done;
                                break;
                            }
                        },
                        Phase::Done => break,
                    }
                }
                found
            }
            _ => None,
        };
        match found {
            Some(id) => {
                self.current = id;
                self.state = CursorState::Positioned;
                true
            }
            None => {
                self.state = CursorState::Exhausted;
                self.view = None;
                false
            }
        }
    }

    fn close(&mut self) {
        self.view = None;
        self.label = None;
        self.phase = Phase::Done;
        self.added.clear();
        self.current = NO_ID;
        self.state = CursorState::Unpositioned;
    }

    fn state(&self) -> CursorState {
        self.state
    }
}
