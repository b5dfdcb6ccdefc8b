use std::sync::Arc;

use crate::scan::ScanBatch;
use crate::store::records::RelationshipData;
use crate::txstate::view::ReadView;
use crate::types::{PropertyKeyId, TypeId, NO_ID};
use crate::values::Value;

use super::node::NodeCursor;
use super::property::{PropertyCursor, PropertyOwner, PropertySelection};
use super::references::PropertiesReference;
use super::{assert_positioned, Cursor, CursorState};

#[derive(Debug, Default)]
enum Source {
    #[default]
    None,
    Single {
        id: i64,
        done: bool,
    },
    Batch(ScanBatch),
}

/// Relationships from a single lookup, a full scan or a parallel scan batch.
#[derive(Debug, Default)]
pub struct RelationshipScanCursor {
    view: Option<ReadView>,
    state: CursorState,
    source: Source,
    current: i64,
    data: Option<RelationshipData>,
}

impl RelationshipScanCursor {
    /// Creates an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn init_single(&mut self, view: ReadView, id: i64) {
        self.reset(view, Source::Single { id, done: false });
    }

    pub(crate) fn init_scan(&mut self, view: ReadView) {
        let added: Arc<[i64]> = match view.tx() {
            Some(tx) => tx.added_relationships().iter().copied().collect(),
            None => Arc::from(Vec::new()),
        };
        let batch = ScanBatch::full(view.store().relationship_high_id(), added);
        self.reset(view, Source::Batch(batch));
    }

    pub(crate) fn init_batch(&mut self, view: ReadView, batch: ScanBatch) {
        self.reset(view, Source::Batch(batch));
    }

    fn reset(&mut self, view: ReadView, source: Source) {
        view.metrics().cursor_initialized("relationship");
        self.source = source;
        self.current = NO_ID;
        self.data = None;
        self.state = CursorState::Unpositioned;
        self.view = Some(view);
    }

    fn positioned(&self) -> (&ReadView, RelationshipData) {
        assert_positioned(self.state, "relationship scan");
        match (&self.view, self.data) {
            (Some(view), Some(data)) => (view, data),
            _ => unreachable!("positioned relationship cursor has data"),
        }
    }

    /// Reference of the current relationship.
    pub fn relationship_reference(&self) -> i64 {
        self.positioned();
        self.current
    }

    /// Type of the current relationship.
    pub fn type_id(&self) -> TypeId {
        self.positioned().1.ty
    }

    /// Source node of the current relationship.
    pub fn source_node_reference(&self) -> i64 {
        self.positioned().1.source
    }

    /// Target node of the current relationship.
    pub fn target_node_reference(&self) -> i64 {
        self.positioned().1.target
    }

    /// Reference to the committed properties of the current relationship.
    pub fn properties_reference(&self) -> PropertiesReference {
        let view = self.positioned().0.as_ref();
        if view.relationship_is_added(self.current) {
            return PropertiesReference::NONE;
        }
        view.store
            .relationship(self.current)
            .map_or(PropertiesReference::NONE, |r| PropertiesReference(r.properties))
    }

    /// Whether the current relationship has any property.
    pub fn has_properties(&self) -> bool {
        self.positioned()
            .0
            .as_ref()
            .relationship_has_properties(self.current)
    }

    /// Value of one property of the current relationship, if present.
    pub fn property_value(&self, key: PropertyKeyId) -> Option<&Value> {
        self.positioned()
            .0
            .as_ref()
            .relationship_property(self.current, key)
    }

    /// Positions `cursor` over the current relationship's properties.
    pub fn properties(&self, cursor: &mut PropertyCursor) {
        self.properties_with(cursor, PropertySelection::All);
    }

    /// Positions `cursor` over the selected properties of the current
    /// relationship.
    pub fn properties_with(&self, cursor: &mut PropertyCursor, selection: PropertySelection) {
        let reference = self.properties_reference();
        cursor.init(
            self.positioned().0.clone(),
            PropertyOwner::Relationship(self.current),
            reference,
            selection,
        );
    }

    /// Positions `cursor` on the source node.
    pub fn source(&self, cursor: &mut NodeCursor) {
        let (view, data) = self.positioned();
        cursor.init_single(view.clone(), data.source);
    }

    /// Positions `cursor` on the target node.
    pub fn target(&self, cursor: &mut NodeCursor) {
        let (view, data) = self.positioned();
        cursor.init_single(view.clone(), data.target);
    }
}

impl Cursor for RelationshipScanCursor {
    fn next(&mut self) -> bool {
        let found = match (&self.view, &mut self.source) {
            (Some(view), Source::Single { id, done }) => {
                let found = if *done {
                    None
                } else {
                    view.as_ref().relationship(*id).map(|data| (*id, data))
                };
                *done = true;
                found
            }
            (Some(view), Source::Batch(batch)) => {
                let merged = view.as_ref();
                loop {
                    match batch.next_id() {
                        Some(id) => {
                            if let Some(data) = merged.relationship(id) {
                                break Some((id, data));
                            }
                        }
                        None => break None,
                    }
                }
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
                self.state = CursorState::Exhausted;
                self.view = None;
                self.data = None;
                false
            }
        }
    }

    fn close(&mut self) {
        self.view = None;
        self.source = Source::None;
        self.current = NO_ID;
        self.data = None;
        self.state = CursorState::Unpositioned;
    }

    fn state(&self) -> CursorState {
        self.state
    }
}
