use std::fmt;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Kind of entity a write targeted when it failed to resolve.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EntityType {
    /// A node reference.
    Node,
    /// A relationship reference.
    Relationship,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Node => f.write_str("node"),
            EntityType::Relationship => f.write_str("relationship"),
        }
    }
}

/// Errors surfaced by the kernel read/write API.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A write targeted an entity that does not exist or was deleted.
    #[error("{entity} {id} not found")]
    EntityNotFound {
        /// Kind of the missing entity.
        entity: EntityType,
        /// Reference that failed to resolve.
        id: i64,
    },
    /// An argument was rejected before any work happened.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A token name was empty or otherwise unusable.
    #[error("illegal token name: {0:?}")]
    IllegalTokenName(String),
    /// A schema constraint refused the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// The transaction was terminated from outside.
    #[error("transaction has been terminated")]
    TransactionTerminated,
    /// The transaction was already committed, rolled back or closed.
    #[error("transaction is closed")]
    TransactionClosed,
    /// A commit found that an entity it writes was removed, or that a node it
    /// deletes gained relationships, since the transaction began.
    #[error("write conflict on {entity} {id}")]
    Conflict {
        /// Kind of the conflicting entity.
        entity: EntityType,
        /// Reference of the conflicting entity.
        id: i64,
    },
    /// The requested operation is not supported by this kernel.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl KernelError {
    pub(crate) fn node_not_found(id: i64) -> Self {
        KernelError::EntityNotFound {
            entity: EntityType::Node,
            id,
        }
    }

    pub(crate) fn relationship_not_found(id: i64) -> Self {
        KernelError::EntityNotFound {
            entity: EntityType::Relationship,
            id,
        }
    }

    pub(crate) fn conflict(entity: EntityType, id: i64) -> Self {
        KernelError::Conflict { entity, id }
    }
}
