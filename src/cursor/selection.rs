//! Direction/type filtering over committed adjacency.
//!
//! A sparse node keeps one chain; each relationship is classified against
//! the origin and filtered. A dense node keeps one group per type; the walk
//! skips groups of excluded types without reading their chains and reads the
//! selected sub-chains of the rest in the order incoming, loop, outgoing.
use smallvec::SmallVec;

use crate::store::records::{Adjacency, RelationshipData};
use crate::txstate::view::ReadView;
use crate::types::{RelationshipDirection, TypeId};

/// Direction of a relationship selection relative to the origin node.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Relationships starting at the origin; loops included.
    Outgoing,
    /// Relationships ending at the origin; loops included.
    Incoming,
    /// Every relationship; loops once.
    #[default]
    Both,
}

impl Direction {
    /// Whether outgoing relationships match.
    pub fn includes_outgoing(self) -> bool {
        matches!(self, Direction::Outgoing | Direction::Both)
    }

    /// Whether incoming relationships match.
    pub fn includes_incoming(self) -> bool {
        matches!(self, Direction::Incoming | Direction::Both)
    }
}

/// Which relationships of a node a traversal yields.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RelationshipSelection {
    types: Option<SmallVec<[TypeId; 4]>>,
    direction: Direction,
}

impl RelationshipSelection {
    /// Every relationship.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every type, in one direction.
    pub fn in_direction(direction: Direction) -> Self {
        Self {
            types: None,
            direction,
        }
    }

    /// The given types, in one direction.
    pub fn of_types(types: &[TypeId], direction: Direction) -> Self {
        let mut types: SmallVec<[TypeId; 4]> = SmallVec::from_slice(types);
        types.sort_unstable();
        types.dedup();
        Self {
            types: Some(types),
            direction,
        }
    }

    /// One type, in one direction.
    pub fn of_type(ty: TypeId, direction: Direction) -> Self {
        Self::of_types(&[ty], direction)
    }

    /// Selected direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether relationships of `ty` are selected.
    pub fn test_type(&self, ty: TypeId) -> bool {
        self.types
            .as_ref()
            .map_or(true, |types| types.binary_search(&ty).is_ok())
    }

    /// Whether relationships in `direction` relative to the origin are selected.
    pub fn test_direction(&self, direction: RelationshipDirection) -> bool {
        match direction {
            RelationshipDirection::Outgoing => self.direction.includes_outgoing(),
            RelationshipDirection::Incoming => self.direction.includes_incoming(),
            RelationshipDirection::Loop => true,
        }
    }
}

/// Sub-chain order inside one group.
pub(crate) const GROUP_ORDER: [RelationshipDirection; 3] = [
    RelationshipDirection::Incoming,
    RelationshipDirection::Loop,
    RelationshipDirection::Outgoing,
];

fn stage_of(direction: RelationshipDirection) -> usize {
    match direction {
        RelationshipDirection::Incoming => 0,
        RelationshipDirection::Loop => 1,
        RelationshipDirection::Outgoing => 2,
    }
}

/// Filter applied while walking chains: a selection, or exactly one
/// direction of one type.
#[derive(Clone, Debug)]
pub(crate) enum ChainFilter {
    Selection(RelationshipSelection),
    Exact {
        ty: TypeId,
        direction: RelationshipDirection,
    },
}

impl ChainFilter {
    pub(crate) fn accepts_type(&self, ty: TypeId) -> bool {
        match self {
            ChainFilter::Selection(selection) => selection.test_type(ty),
            ChainFilter::Exact { ty: wanted, .. } => *wanted == ty,
        }
    }

    pub(crate) fn accepts_direction(&self, direction: RelationshipDirection) -> bool {
        match self {
            ChainFilter::Selection(selection) => selection.test_direction(direction),
            ChainFilter::Exact {
                direction: wanted, ..
            } => *wanted == direction,
        }
    }

    pub(crate) fn accepts(&self, ty: TypeId, direction: RelationshipDirection) -> bool {
        self.accepts_type(ty) && self.accepts_direction(direction)
    }
}

/// Position inside committed adjacency.
#[derive(Clone, Debug, Default)]
pub(crate) enum StoreWalk {
    #[default]
    Done,
    Sparse {
        pos: usize,
    },
    Dense {
        group: i64,
        stage: usize,
        pos: usize,
        single: bool,
    },
}

impl StoreWalk {
    /// Walk over every group starting at `first_group`.
    pub(crate) fn groups(first_group: i64) -> Self {
        StoreWalk::Dense {
            group: first_group,
            stage: 0,
            pos: 0,
            single: false,
        }
    }

    /// Walk over one sub-chain of one group.
    pub(crate) fn group_chain(group: i64, direction: RelationshipDirection) -> Self {
        StoreWalk::Dense {
            group,
            stage: stage_of(direction),
            pos: 0,
            single: true,
        }
    }

    /// Next committed relationship of `origin` passing `filter` that the view
    /// still sees.
    pub(crate) fn advance(
        &mut self,
        view: &ReadView,
        origin: i64,
        filter: &ChainFilter,
    ) -> Option<(i64, RelationshipData)> {
        let merged = view.as_ref();
        let store = view.store();
        loop {
            match self {
                StoreWalk::Done => return None,
                StoreWalk::Sparse { pos } => {
                    let chain = match store.node(origin).map(|n| &n.adjacency) {
                        Some(Adjacency::Sparse { chain }) => chain,
                        _ => {
                            *self = StoreWalk::Done;
                            continue;
                        }
                    };
                    if *pos == 0 {
                        view.metrics().relationship_chain_opened();
                    }
                    while *pos < chain.len() {
                        let id = chain[*pos];
                        *pos += 1;
                        if merged.relationship_is_deleted(id) {
                            continue;
                        }
                        let Some(record) = store.relationship(id) else {
                            continue;
                        };
                        let Some(direction) = record.data.direction_from(origin) else {
                            continue;
                        };
                        if filter.accepts(record.data.ty, direction) {
                            return Some((id, record.data));
                        }
                    }
                    *self = StoreWalk::Done;
                }
                StoreWalk::Dense {
                    group,
                    stage,
                    pos,
                    single,
                } => {
                    let Some(record) = store.group(*group) else {
                        *self = StoreWalk::Done;
                        continue;
                    };
                    if filter.accepts_type(record.ty) {
                        while *stage < GROUP_ORDER.len() {
                            let direction = GROUP_ORDER[*stage];
                            if filter.accepts_direction(direction) {
                                let chain = record.chain(direction);
                                if *pos == 0 && !chain.is_empty() {
                                    view.metrics().relationship_chain_opened();
                                }
                                while *pos < chain.len() {
                                    let id = chain[*pos];
                                    *pos += 1;
                                    if merged.relationship_is_deleted(id) {
                                        continue;
                                    }
                                    if let Some(rel) = store.relationship(id) {
                                        return Some((id, rel.data));
                                    }
                                }
                            }
                            *stage += 1;
                            *pos = 0;
                        }
                    }
                    if *single {
                        *self = StoreWalk::Done;
                    } else {
                        *group = record.next;
                        *stage = 0;
                        *pos = 0;
                    }
                }
            }
        }
    }
}
