use parking_lot::Mutex;

use super::{
    Cursor, NodeCursor, NodeLabelIndexCursor, NodeValueIndexCursor, PropertyCursor,
    RelationshipGroupCursor, RelationshipScanCursor, RelationshipTraversalCursor,
};

/// Free list of closed cursors of one kind.
#[derive(Debug)]
pub struct CursorPool<C> {
    inner: Mutex<Vec<C>>,
    capacity: usize,
}

impl<C: Cursor + Default> CursorPool<C> {
    /// Creates a pool keeping at most `capacity` idle cursors.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Takes an idle cursor, or creates one when none is idle.
    pub fn acquire(&self) -> PooledCursor<'_, C> {
        let cursor = self.inner.lock().pop().unwrap_or_default();
        PooledCursor {
            pool: self,
            cursor: Some(cursor),
        }
    }

    /// Idle cursors currently held.
    pub fn available(&self) -> usize {
        self.inner.lock().len()
    }

    fn release(&self, mut cursor: C) {
        cursor.close();
        let mut pool = self.inner.lock();
        if pool.len() < self.capacity {
            pool.push(cursor);
        }
    }
}

/// Cursor borrowed from a [`CursorPool`]; closed and returned on drop.
#[derive(Debug)]
pub struct PooledCursor<'a, C: Cursor + Default> {
    pool: &'a CursorPool<C>,
    cursor: Option<C>,
}

impl<'a, C: Cursor + Default> std::ops::Deref for PooledCursor<'a, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.cursor.as_ref().expect("cursor present")
    }
}

impl<'a, C: Cursor + Default> std::ops::DerefMut for PooledCursor<'a, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.cursor.as_mut().expect("cursor present")
    }
}

impl<'a, C: Cursor + Default> Drop for PooledCursor<'a, C> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            self.pool.release(cursor);
        }
    }
}

/// One pool per cursor kind.
#[derive(Debug)]
pub struct CursorFactory {
    nodes: CursorPool<NodeCursor>,
    relationships: CursorPool<RelationshipScanCursor>,
    traversals: CursorPool<RelationshipTraversalCursor>,
    groups: CursorPool<RelationshipGroupCursor>,
    properties: CursorPool<PropertyCursor>,
    label_indexes: CursorPool<NodeLabelIndexCursor>,
    value_indexes: CursorPool<NodeValueIndexCursor>,
}

impl CursorFactory {
    /// Creates pools keeping at most `capacity` idle cursors each.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: CursorPool::new(capacity),
            relationships: CursorPool::new(capacity),
            traversals: CursorPool::new(capacity),
            groups: CursorPool::new(capacity),
            properties: CursorPool::new(capacity),
            label_indexes: CursorPool::new(capacity),
            value_indexes: CursorPool::new(capacity),
        }
    }

    /// Node cursor.
    pub fn allocate_node_cursor(&self) -> PooledCursor<'_, NodeCursor> {
        self.nodes.acquire()
    }

    /// Relationship scan cursor.
    pub fn allocate_relationship_scan_cursor(&self) -> PooledCursor<'_, RelationshipScanCursor> {
        self.relationships.acquire()
    }

    /// Relationship traversal cursor.
    pub fn allocate_relationship_traversal_cursor(
        &self,
    ) -> PooledCursor<'_, RelationshipTraversalCursor> {
        self.traversals.acquire()
    }

    /// Relationship group cursor.
    pub fn allocate_relationship_group_cursor(&self) -> PooledCursor<'_, RelationshipGroupCursor> {
        self.groups.acquire()
    }

    /// Property cursor.
    pub fn allocate_property_cursor(&self) -> PooledCursor<'_, PropertyCursor> {
        self.properties.acquire()
    }

    /// Label index cursor.
    pub fn allocate_node_label_index_cursor(&self) -> PooledCursor<'_, NodeLabelIndexCursor> {
        self.label_indexes.acquire()
    }

    /// Value index cursor.
    pub fn allocate_node_value_index_cursor(&self) -> PooledCursor<'_, NodeValueIndexCursor> {
        self.value_indexes.acquire()
    }
}

impl Default for CursorFactory {
    fn default() -> Self {
        Self::new(16)
    }
}
