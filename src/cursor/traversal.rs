use crate::store::records::{Adjacency, RelationshipData};
use crate::txstate::view::ReadView;
use crate::types::{PropertyKeyId, RelationshipDirection, TypeId, NO_ID};

use super::node::NodeCursor;
use super::property::{PropertyCursor, PropertyOwner, PropertySelection};
use super::references::{PropertiesReference, RelationshipsRef, RelationshipsReference};
use super::selection::{ChainFilter, RelationshipSelection, StoreWalk, GROUP_ORDER};
use super::{assert_positioned, Cursor, CursorState};

/// Relationships of one node, filtered by a selection or restricted to one
/// group sub-chain.
///
/// Relationships created by the transaction come first, then committed ones
/// the transaction has not deleted.
#[derive(Debug, Default)]
pub struct RelationshipTraversalCursor {
    view: Option<ReadView>,
    state: CursorState,
    origin: i64,
    filter: Option<ChainFilter>,
    tx_ids: Vec<i64>,
    tx_pos: usize,
    walk: StoreWalk,
    current: i64,
    data: Option<RelationshipData>,
}

impl RelationshipTraversalCursor {
    /// Creates an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn init(
        &mut self,
        view: ReadView,
        origin: i64,
        reference: RelationshipsReference,
        selection: &RelationshipSelection,
    ) {
        let filter = match reference.0 {
            RelationshipsRef::GroupChain { ty, direction, .. } => {
                ChainFilter::Exact { ty, direction }
            }
            _ => ChainFilter::Selection(selection.clone()),
        };
        let merged = view.as_ref();
        self.walk = match reference.0 {
            RelationshipsRef::Empty => StoreWalk::Done,
            RelationshipsRef::Chain => StoreWalk::Sparse { pos: 0 },
            RelationshipsRef::Groups { first_group } => StoreWalk::groups(first_group),
            RelationshipsRef::GroupChain {
                group, direction, ..
            } if group >= 0 => StoreWalk::group_chain(group, direction),
            RelationshipsRef::GroupChain { .. } => {
                match merged.store_node(origin).map(|n| &n.adjacency) {
                    Some(Adjacency::Sparse { .. }) => StoreWalk::Sparse { pos: 0 },
                    _ => StoreWalk::Done,
                }
            }
        };
        self.tx_ids.clear();
        if let Some(state) = merged.node_state(origin) {
            for (ty, ids) in state.added_relationships.iter() {
                if !filter.accepts_type(ty) {
                    continue;
                }
                for direction in GROUP_ORDER {
                    if filter.accepts_direction(direction) {
                        self.tx_ids.extend_from_slice(ids.get(direction));
                    }
                }
            }
        }
        view.metrics().cursor_initialized("traversal");
        self.tx_pos = 0;
        self.origin = origin;
        self.filter = Some(filter);
        self.data = None;
        self.current = NO_ID;
        self.state = CursorState::Unpositioned;
        self.view = Some(view);
    }

    fn positioned(&self) -> RelationshipData {
        assert_positioned(self.state, "relationship traversal");
        self.data.expect("positioned traversal has relationship data")
    }

    /// Reference of the current relationship.
    pub fn relationship_reference(&self) -> i64 {
        self.positioned();
        self.current
    }

    /// Type of the current relationship.
    pub fn type_id(&self) -> TypeId {
        self.positioned().ty
    }

    /// Source node of the current relationship.
    pub fn source_node_reference(&self) -> i64 {
        self.positioned().source
    }

    /// Target node of the current relationship.
    pub fn target_node_reference(&self) -> i64 {
        self.positioned().target
    }

    /// Node the traversal started from.
    pub fn origin_node_reference(&self) -> i64 {
        self.positioned();
        self.origin
    }

    /// Endpoint that is not the origin; the origin itself for loops.
    pub fn other_node_reference(&self) -> i64 {
        self.positioned().other(self.origin)
    }

    /// Direction of the current relationship relative to the origin.
    pub fn direction(&self) -> RelationshipDirection {
        let data = self.positioned();
        data.direction_from(self.origin)
            .unwrap_or(RelationshipDirection::Outgoing)
    }

    /// Reference to the committed properties of the current relationship.
    pub fn properties_reference(&self) -> PropertiesReference {
        self.positioned();
        let view = self.view.as_ref().map(ReadView::as_ref);
        match view {
            Some(view) if !view.relationship_is_added(self.current) => PropertiesReference(
                view.store.relationship(self.current).map_or(NO_ID, |r| r.properties),
            ),
            _ => PropertiesReference::NONE,
        }
    }

    /// Whether the current relationship has any property.
    pub fn has_properties(&self) -> bool {
        self.positioned();
        self.view
            .as_ref()
            .is_some_and(|v| v.as_ref().relationship_has_properties(self.current))
    }

    /// Value of one property of the current relationship, if present.
    pub fn property_value(&self, key: PropertyKeyId) -> Option<&crate::values::Value> {
        self.positioned();
        self.view
            .as_ref()
            .and_then(|v| v.as_ref().relationship_property(self.current, key))
    }

    /// Positions `cursor` over the current relationship's properties.
    pub fn properties(&self, cursor: &mut PropertyCursor) {
        self.properties_with(cursor, PropertySelection::All);
    }

    /// Positions `cursor` over the selected properties of the current relationship.
    pub fn properties_with(&self, cursor: &mut PropertyCursor, selection: PropertySelection) {
        let reference = self.properties_reference();
        if let Some(view) = &self.view {
            cursor.init(
                view.clone(),
                PropertyOwner::Relationship(self.current),
                reference,
                selection,
            );
        }
    }

    /// Positions `cursor` on the endpoint that is not the origin.
    pub fn other_node(&self, cursor: &mut NodeCursor) {
        let other = self.other_node_reference();
        if let Some(view) = &self.view {
            cursor.init_single(view.clone(), other);
        }
    }

    fn exhaust(&mut self) {
        self.state = CursorState::Exhausted;
        self.view = None;
        self.data = None;
    }
}

impl Cursor for RelationshipTraversalCursor {
    fn next(&mut self) -> bool {
        let found = match (&self.view, &self.filter) {
            (Some(view), Some(filter)) => {
                let merged = view.as_ref();
                let mut found = None;
                while self.tx_pos < self.tx_ids.len() {
                    let id = self.tx_ids[self.tx_pos];
                    self.tx_pos += 1;
                    if let Some(data) = merged.relationship(id) {
                        found = Some((id, data));
                        break;
                    }
                }
                found.or_else(|| self.walk.advance(view, self.origin, filter))
            }
            _ => None,
        };
        match found {
            Some((id, data)) => {
                self.current = id;
                self.data = Some(data);
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
        self.filter = None;
        self.tx_ids.clear();
        self.tx_pos = 0;
        self.walk = StoreWalk::Done;
        self.data = None;
        self.current = NO_ID;
        self.state = CursorState::Unpositioned;
    }

    fn state(&self) -> CursorState {
        self.state
    }
}
