//! Identifier types shared across the kernel.
//!
//! Entity references are plain `i64`s: every non-negative value names a node or
//! relationship slot, every negative value (canonically [`NO_ID`]) never
//! resolves to data. Tokens are small signed newtypes where `-1` is the
//! "any" wildcard accepted by count queries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference value that never resolves to an entity.
pub const NO_ID: i64 = -1;

/// Returns `true` when `reference` may resolve to an entity.
#[inline]
pub fn is_reference(reference: i64) -> bool {
    reference >= 0
}

macro_rules! token_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(pub i32);

        impl $name {
            /// Wildcard accepted by count queries.
            pub const ANY: $name = $name(-1);

            /// Returns `true` for the [`Self::ANY`] wildcard.
            #[inline]
            pub fn is_any(self) -> bool {
                self.0 < 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                $name(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

token_id!(
    /// Label token id.
    LabelId
);
token_id!(
    /// Relationship type token id.
    TypeId
);
token_id!(
    /// Property key token id.
    PropertyKeyId
);

/// Position of a relationship relative to the node it is read from.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum RelationshipDirection {
    /// The origin node is the source and not the target.
    Outgoing,
    /// The origin node is the target and not the source.
    Incoming,
    /// Source and target are both the origin node.
    Loop,
}

impl RelationshipDirection {
    /// Classifies a relationship against `origin`, or `None` when `origin` is
    /// neither endpoint.
    pub fn classify(origin: i64, source: i64, target: i64) -> Option<Self> {
        match (source == origin, target == origin) {
            (true, true) => Some(RelationshipDirection::Loop),
            (true, false) => Some(RelationshipDirection::Outgoing),
            (false, true) => Some(RelationshipDirection::Incoming),
            (false, false) => None,
        }
    }
}
