use smallvec::SmallVec;

use crate::store::records::Adjacency;
use crate::txstate::view::{ReadView, ViewRef};
use crate::types::{RelationshipDirection, TypeId, NO_ID};

use super::references::{RelationshipsRef, RelationshipsReference};
use super::selection::{Direction, RelationshipSelection};
use super::traversal::RelationshipTraversalCursor;
use super::{assert_positioned, Cursor, CursorState};

/// Per-type relationship counts of one node as a transaction sees them.
#[derive(Copy, Clone, Debug)]
pub(crate) struct GroupEntry {
    pub(crate) ty: TypeId,
    pub(crate) group: i64,
    pub(crate) outgoing: usize,
    pub(crate) incoming: usize,
    pub(crate) loops: usize,
}

impl GroupEntry {
    fn empty(ty: TypeId, group: i64) -> Self {
        Self {
            ty,
            group,
            outgoing: 0,
            incoming: 0,
            loops: 0,
        }
    }

    fn bump(&mut self, direction: RelationshipDirection, by: usize) {
        match direction {
            RelationshipDirection::Outgoing => self.outgoing += by,
            RelationshipDirection::Incoming => self.incoming += by,
            RelationshipDirection::Loop => self.loops += by,
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.outgoing + self.incoming + self.loops
    }
}

fn entry_for(groups: &mut Vec<GroupEntry>, ty: TypeId) -> &mut GroupEntry {
    let at = match groups.iter().position(|g| g.ty == ty) {
        Some(at) => at,
        None => {
            groups.push(GroupEntry::empty(ty, NO_ID));
            groups.len() - 1
        }
    };
    &mut groups[at]
}

/// Fills `out` with the merged groups of `node`. Types whose merged total is
/// zero are left out.
pub(crate) fn collect_groups(
    view: ViewRef<'_>,
    node: i64,
    reference: RelationshipsReference,
    out: &mut Vec<GroupEntry>,
) {
    out.clear();
    if !view.node_exists(node) {
        return;
    }
    let state = view.node_state(node);
    match reference.0 {
        RelationshipsRef::Groups { first_group } => {
            let mut cursor = first_group;
            while let Some(group) = view.store.group(cursor) {
                let mut entry = GroupEntry::empty(group.ty, cursor);
                for direction in [
                    RelationshipDirection::Outgoing,
                    RelationshipDirection::Incoming,
                    RelationshipDirection::Loop,
                ] {
                    let deleted =
                        state.map_or(0, |s| s.deleted_relationships.count(group.ty, direction));
                    entry.bump(direction, group.chain(direction).len().saturating_sub(deleted));
                }
                out.push(entry);
                cursor = group.next;
            }
        }
        RelationshipsRef::Chain => {
            if let Some(Adjacency::Sparse { chain }) = view.store_node(node).map(|n| &n.adjacency) {
                for id in chain {
                    if view.relationship_is_deleted(*id) {
                        continue;
                    }
                    let Some(record) = view.store.relationship(*id) else {
                        continue;
                    };
                    if let Some(direction) = record.data.direction_from(node) {
                        entry_for(out, record.data.ty).bump(direction, 1);
                    }
                }
            }
        }
        RelationshipsRef::Empty | RelationshipsRef::GroupChain { .. } => {}
    }
    if let Some(state) = state {
        for (ty, ids) in state.added_relationships.iter() {
            let entry = entry_for(out, ty);
            for direction in [
                RelationshipDirection::Outgoing,
                RelationshipDirection::Incoming,
                RelationshipDirection::Loop,
            ] {
                entry.bump(direction, ids.count(direction));
            }
        }
    }
    out.retain(|g| g.total() > 0);
}

/// Relationship groups of one node: one entry per relationship type with
/// per-direction counts and references to each direction's relationships.
///
/// Counts include the transaction's changes. Types with no remaining
/// relationships are skipped; the order across types is unspecified.
#[derive(Debug, Default)]
pub struct RelationshipGroupCursor {
    view: Option<ReadView>,
    state: CursorState,
    origin: i64,
    groups: Vec<GroupEntry>,
    pos: usize,
}

impl RelationshipGroupCursor {
    /// Creates an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn init(&mut self, view: ReadView, origin: i64, reference: RelationshipsReference) {
        collect_groups(view.as_ref(), origin, reference, &mut self.groups);
        view.metrics().cursor_initialized("group");
        self.origin = origin;
        self.pos = 0;
        self.state = CursorState::Unpositioned;
        self.view = Some(view);
    }

    fn current(&self) -> &GroupEntry {
        assert_positioned(self.state, "relationship group");
        &self.groups[self.pos - 1]
    }

    /// Relationship type of the current group.
    pub fn type_id(&self) -> TypeId {
        self.current().ty
    }

    /// Node the groups belong to.
    pub fn origin_node_reference(&self) -> i64 {
        self.current();
        self.origin
    }

    /// Outgoing relationships of this type, loops excluded.
    pub fn outgoing_count(&self) -> usize {
        self.current().outgoing
    }

    /// Incoming relationships of this type, loops excluded.
    pub fn incoming_count(&self) -> usize {
        self.current().incoming
    }

    /// Loops of this type.
    pub fn loop_count(&self) -> usize {
        self.current().loops
    }

    /// All relationships of this type.
    pub fn total_count(&self) -> usize {
        self.current().total()
    }

    fn reference(&self, direction: RelationshipDirection) -> RelationshipsReference {
        let entry = self.current();
        RelationshipsReference(RelationshipsRef::GroupChain {
            group: entry.group,
            ty: entry.ty,
            direction,
        })
    }

    /// Detached reference to the outgoing relationships of this group.
    pub fn outgoing_reference(&self) -> RelationshipsReference {
        self.reference(RelationshipDirection::Outgoing)
    }

    /// Detached reference to the incoming relationships of this group.
    pub fn incoming_reference(&self) -> RelationshipsReference {
        self.reference(RelationshipDirection::Incoming)
    }

    /// Detached reference to the loops of this group.
    pub fn loops_reference(&self) -> RelationshipsReference {
        self.reference(RelationshipDirection::Loop)
    }

    fn traverse(&self, cursor: &mut RelationshipTraversalCursor, direction: RelationshipDirection) {
        let reference = self.reference(direction);
        if let Some(view) = &self.view {
            cursor.init(view.clone(), self.origin, reference, &RelationshipSelection::all());
        }
    }

    /// Positions `cursor` over the outgoing relationships of this group.
    pub fn outgoing(&self, cursor: &mut RelationshipTraversalCursor) {
        self.traverse(cursor, RelationshipDirection::Outgoing);
    }

    /// Positions `cursor` over the incoming relationships of this group.
    pub fn incoming(&self, cursor: &mut RelationshipTraversalCursor) {
        self.traverse(cursor, RelationshipDirection::Incoming);
    }

    /// Positions `cursor` over the loops of this group.
    pub fn loops(&self, cursor: &mut RelationshipTraversalCursor) {
        self.traverse(cursor, RelationshipDirection::Loop);
    }
}

impl Cursor for RelationshipGroupCursor {
    fn next(&mut self) -> bool {
        if self.view.is_some() && self.pos < self.groups.len() {
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
        self.groups.clear();
        self.pos = 0;
        self.state = CursorState::Unpositioned;
    }

    fn state(&self) -> CursorState {
        self.state
    }
}

/// Degrees of one relationship type.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TypeDegrees {
    ty: TypeId,
    outgoing: usize,
    incoming: usize,
    loops: usize,
}

impl TypeDegrees {
    /// Relationship type.
    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    /// Outgoing relationships, loops included.
    pub fn outgoing_degree(&self) -> usize {
        self.outgoing + self.loops
    }

    /// Incoming relationships, loops included.
    pub fn incoming_degree(&self) -> usize {
        self.incoming + self.loops
    }

    /// All relationships, loops once.
    pub fn total_degree(&self) -> usize {
        self.outgoing + self.incoming + self.loops
    }

    /// Loops.
    pub fn loop_count(&self) -> usize {
        self.loops
    }
}

/// Per-type degrees of a node, restricted to a selection.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Degrees {
    types: SmallVec<[TypeDegrees; 4]>,
}

impl Degrees {
    pub(crate) fn from_groups(groups: &[GroupEntry], selection: &RelationshipSelection) -> Self {
        let direction = selection.direction();
        let mut types: SmallVec<[TypeDegrees; 4]> = groups
            .iter()
            .filter(|g| selection.test_type(g.ty))
            .map(|g| TypeDegrees {
                ty: g.ty,
                outgoing: if direction.includes_outgoing() { g.outgoing } else { 0 },
                incoming: if direction.includes_incoming() { g.incoming } else { 0 },
                loops: g.loops,
            })
            .filter(|d| d.total_degree() > 0)
            .collect();
        types.sort_unstable_by_key(|d| d.ty);
        Self { types }
    }

    /// Types with at least one selected relationship, ascending.
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types.iter().map(|d| d.ty)
    }

    /// Degrees of one type.
    pub fn of(&self, ty: TypeId) -> Option<TypeDegrees> {
        self.types
            .binary_search_by_key(&ty, |d| d.ty)
            .ok()
            .map(|at| self.types[at])
    }

    /// Outgoing degree summed over every selected type.
    pub fn outgoing_degree(&self) -> usize {
        self.types.iter().map(TypeDegrees::outgoing_degree).sum()
    }

    /// Incoming degree summed over every selected type.
    pub fn incoming_degree(&self) -> usize {
        self.types.iter().map(TypeDegrees::incoming_degree).sum()
    }

    /// Total degree summed over every selected type.
    pub fn total_degree(&self) -> usize {
        self.types.iter().map(TypeDegrees::total_degree).sum()
    }

    /// Outgoing degree of one type; zero if absent.
    pub fn outgoing_degree_of(&self, ty: TypeId) -> usize {
        self.of(ty).map_or(0, |d| d.outgoing_degree())
    }

    /// Incoming degree of one type; zero if absent.
    pub fn incoming_degree_of(&self, ty: TypeId) -> usize {
        self.of(ty).map_or(0, |d| d.incoming_degree())
    }

    /// Total degree of one type; zero if absent.
    pub fn total_degree_of(&self, ty: TypeId) -> usize {
        self.of(ty).map_or(0, |d| d.total_degree())
    }

    /// Degree in `direction` summed over every selected type.
    pub fn degree(&self, direction: Direction) -> usize {
        match direction {
            Direction::Outgoing => self.outgoing_degree(),
            Direction::Incoming => self.incoming_degree(),
            Direction::Both => self.total_degree(),
        }
    }

    /// Returns `true` if no selected relationship exists.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
