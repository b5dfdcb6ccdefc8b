//! Reusable cursors over nodes, relationships, properties and indexes.
//!
//! Every cursor follows one protocol: it is created empty, initialised by a
//! read operation (or by another positioned cursor), advanced with
//! [`Cursor::next`] and returned to its empty state with [`Cursor::close`].
//! Accessors are only meaningful while the cursor is positioned and panic
//! otherwise. A cursor reads through a shared snapshot taken at
//! initialisation; dropping or closing it releases the snapshot.

mod group;
mod label_index;
mod node;
mod pool;
mod property;
mod references;
mod relationship_scan;
pub(crate) mod selection;
mod traversal;
mod value_index;

pub use group::{Degrees, RelationshipGroupCursor, TypeDegrees};
pub use label_index::NodeLabelIndexCursor;
pub use node::NodeCursor;
pub use pool::{CursorFactory, CursorPool, PooledCursor};
pub(crate) use property::PropertyOwner;
pub use property::{PropertyCursor, PropertySelection};
pub use references::{PropertiesReference, RelationshipsReference};
pub use relationship_scan::RelationshipScanCursor;
pub use selection::{Direction, RelationshipSelection};
pub use traversal::RelationshipTraversalCursor;
pub use value_index::NodeValueIndexCursor;

/// Lifecycle of a cursor.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum CursorState {
    /// Not on an entity: fresh, closed, or initialised but not yet advanced.
    #[default]
    Unpositioned,
    /// On an entity; accessors are valid.
    Positioned,
    /// Ran past the last entity; `next` keeps returning `false`.
    Exhausted,
}

/// Behaviour shared by every cursor.
pub trait Cursor {
    /// Moves to the next entity, returning `false` once there is none.
    fn next(&mut self) -> bool;

    /// Releases the cursor's snapshot and returns it to [`CursorState::Unpositioned`].
    fn close(&mut self);

    /// Current lifecycle state.
    fn state(&self) -> CursorState;

    /// Returns `true` while accessors are valid.
    fn is_positioned(&self) -> bool {
        self.state() == CursorState::Positioned
    }
}

#[track_caller]
pub(crate) fn assert_positioned(state: CursorState, kind: &'static str) {
    assert!(
        state == CursorState::Positioned,
        "{kind} cursor accessed while {state:?}"
    );
}
