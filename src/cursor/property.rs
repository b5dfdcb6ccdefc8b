use std::ops::Bound;

use smallvec::SmallVec;

use crate::txstate::view::{ReadView, ViewRef};
use crate::txstate::PropertyChanges;
use crate::types::PropertyKeyId;
use crate::values::Value;

use super::references::PropertiesReference;
use super::{assert_positioned, Cursor, CursorState};

/// Which property keys a property cursor yields.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum PropertySelection {
    /// Every key.
    #[default]
    All,
    /// Only the listed keys.
    Keys(SmallVec<[PropertyKeyId; 4]>),
}

impl PropertySelection {
    /// Only the listed keys.
    pub fn keys(keys: &[PropertyKeyId]) -> Self {
        PropertySelection::Keys(SmallVec::from_slice(keys))
    }

    /// Whether `key` is selected.
    pub fn contains(&self, key: PropertyKeyId) -> bool {
        match self {
            PropertySelection::All => true,
            PropertySelection::Keys(keys) => keys.contains(&key),
        }
    }
}

static NO_VALUE: Value = Value::NoValue;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum PropertyOwner {
    #[default]
    None,
    Node(i64),
    Relationship(i64),
}

#[derive(Copy, Clone, Debug, Default)]
enum Phase {
    #[default]
    Tx,
    TxAfter(PropertyKeyId),
    Store(usize),
    Done,
}

#[derive(Copy, Clone, Debug)]
enum Current {
    Tx(PropertyKeyId),
    Store(usize),
}

fn owner_changes<'a>(view: ViewRef<'a>, owner: PropertyOwner) -> Option<&'a PropertyChanges> {
    match owner {
        PropertyOwner::None => None,
        PropertyOwner::Node(id) => view.node_state(id).map(|s| &s.properties),
        PropertyOwner::Relationship(id) => view
            .tx
            .and_then(|tx| tx.relationship_state(id))
            .map(|s| &s.properties),
    }
}

fn owner_visible(view: ViewRef<'_>, owner: PropertyOwner) -> bool {
    match owner {
        PropertyOwner::None => false,
        PropertyOwner::Node(id) => view.node_exists(id),
        PropertyOwner::Relationship(id) => view.relationship_exists(id),
    }
}

/// Properties of one node or relationship.
///
/// Keys written by the transaction come first in ascending key order, then
/// committed keys the transaction did not overwrite or remove.
#[derive(Debug, Default)]
pub struct PropertyCursor {
    view: Option<ReadView>,
    state: CursorState,
    owner: PropertyOwner,
    chain: i64,
    selection: PropertySelection,
    phase: Phase,
    current: Option<Current>,
}

impl PropertyCursor {
    /// Creates an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn init(
        &mut self,
        view: ReadView,
        owner: PropertyOwner,
        reference: PropertiesReference,
        selection: PropertySelection,
    ) {
        let visible = owner_visible(view.as_ref(), owner);
        view.metrics().cursor_initialized("property");
        self.owner = owner;
        self.chain = reference.0;
        self.selection = selection;
        self.phase = if visible { Phase::Tx } else { Phase::Done };
        self.current = None;
        self.state = CursorState::Unpositioned;
        self.view = Some(view);
    }

    fn advance(
        view: &ReadView,
        owner: PropertyOwner,
        chain: i64,
        selection: &PropertySelection,
        phase: &mut Phase,
    ) -> Option<Current> {
        let changes = owner_changes(view.as_ref(), owner);
        loop {
            match *phase {
                Phase::Tx | Phase::TxAfter(_) => {
                    let lower = match *phase {
                        Phase::TxAfter(key) => Bound::Excluded(key),
                        _ => Bound::Unbounded,
                    };
                    let next = changes.and_then(|c| {
                        c.values()
                            .range((lower, Bound::Unbounded))
                            .map(|(k, _)| *k)
                            .find(|k| selection.contains(*k))
                    });
                    match next {
                        Some(key) => {
                            *phase = Phase::TxAfter(key);
                            return Some(Current::Tx(key));
                        }
                        None => *phase = Phase::Store(0),
                    }
                }
                Phase::Store(pos) => {
                    let entries = view.store().property_chain(chain);
                    let found = entries[pos.min(entries.len())..]
                        .iter()
                        .position(|(k, _)| {
                            selection.contains(*k) && !changes.is_some_and(|c| c.shadows(*k))
                        })
                        .map(|offset| pos + offset);
                    match found {
                        Some(at) => {
                            *phase = Phase::Store(at + 1);
                            return Some(Current::Store(at));
                        }
                        None => *phase = Phase::Done,
                    }
                }
                Phase::Done => return None,
            }
        }
    }

    fn positioned(&self) -> (&ReadView, Current) {
        assert_positioned(self.state, "property");
        match (&self.view, self.current) {
            (Some(view), Some(current)) => (view, current),
            _ => unreachable!("positioned property cursor has a view"),
        }
    }

    /// Key of the current property.
    pub fn property_key(&self) -> PropertyKeyId {
        let (view, current) = self.positioned();
        match current {
            Current::Tx(key) => key,
            Current::Store(at) => view.store().property_chain(self.chain)[at].0,
        }
    }

    /// Value of the current property.
    pub fn property_value(&self) -> &Value {
        let (view, current) = self.positioned();
        match current {
            Current::Tx(key) => owner_changes(view.as_ref(), self.owner)
                .and_then(|c| c.values().get(&key))
                .unwrap_or(&NO_VALUE),
            Current::Store(at) => &view.store().property_chain(self.chain)[at].1,
        }
    }

    fn exhaust(&mut self) {
        self.state = CursorState::Exhausted;
        self.view = None;
        self.current = None;
    }
}

impl Cursor for PropertyCursor {
    fn next(&mut self) -> bool {
        let found = match &self.view {
            Some(view) => {
                Self::advance(view, self.owner, self.chain, &self.selection, &mut self.phase)
            }
            None => None,
        };
        match found {
            Some(current) => {
                self.current = Some(current);
                self.state = CursorState::Positioned;
                true
            }
            None => {
                self.exhaust();
                false
            }
        }
    }

    fn close(&mut self) {
        self.view = None;
        self.owner = PropertyOwner::None;
        self.selection = PropertySelection::All;
        self.phase = Phase::Done;
        self.current = None;
        self.state = CursorState::Unpositioned;
    }

    fn state(&self) -> CursorState {
        self.state
    }
}
