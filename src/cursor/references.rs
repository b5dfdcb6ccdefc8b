use crate::types::{RelationshipDirection, TypeId, NO_ID};

/// Opaque handle to a node's relationships, captured from a positioned cursor
/// and usable later (with the owning node) for detached traversal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RelationshipsReference(pub(crate) RelationshipsRef);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum RelationshipsRef {
    /// No committed relationships.
    Empty,
    /// The owner's single committed chain.
    Chain,
    /// The owner's committed groups starting at `first_group`.
    Groups { first_group: i64 },
    /// One direction of one type. `group` is `NO_ID` when the type has no
    /// committed group: a sparse owner's chain is then filtered instead.
    GroupChain {
        group: i64,
        ty: TypeId,
        direction: RelationshipDirection,
    },
}

impl RelationshipsReference {
    /// Reference with no committed relationships behind it.
    pub const NONE: RelationshipsReference = RelationshipsReference(RelationshipsRef::Empty);

    /// Returns `true` if no committed relationships are behind this reference.
    pub fn is_none(&self) -> bool {
        self.0 == RelationshipsRef::Empty
    }
}

/// Opaque handle to an entity's committed properties.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PropertiesReference(pub(crate) i64);

impl PropertiesReference {
    /// Reference with no committed properties behind it.
    pub const NONE: PropertiesReference = PropertiesReference(NO_ID);

    /// Returns `true` if no committed properties are behind this reference.
    pub fn is_none(&self) -> bool {
        self.0 < 0
    }
}
