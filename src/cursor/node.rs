use std::sync::Arc;

use crate::scan::ScanBatch;
use crate::store::records::{Adjacency, LabelSet};
use crate::txstate::view::ReadView;
use crate::types::{LabelId, PropertyKeyId, NO_ID};
use crate::values::Value;

use super::group::{collect_groups, Degrees, RelationshipGroupCursor};
use super::property::{PropertyCursor, PropertyOwner, PropertySelection};
use super::references::{PropertiesReference, RelationshipsRef, RelationshipsReference};
use super::selection::RelationshipSelection;
use super::traversal::RelationshipTraversalCursor;
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

/// Nodes from a single lookup, a full scan or a parallel scan batch.
///
/// A scan yields committed nodes in ascending id order, then nodes the
/// transaction created. Nodes the transaction deleted never appear.
#[derive(Debug, Default)]
pub struct NodeCursor {
    view: Option<ReadView>,
    state: CursorState,
    source: Source,
    current: i64,
    labels: LabelSet,
}

impl NodeCursor {
    /// Creates an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn init_single(&mut self, view: ReadView, id: i64) {
        self.reset(view, Source::Single { id, done: false });
    }

    pub(crate) fn init_scan(&mut self, view: ReadView) {
        let added: Arc<[i64]> = match view.tx() {
            Some(tx) => tx.added_nodes().iter().copied().collect(),
            None => Arc::from(Vec::new()),
        };
        let batch = ScanBatch::full(view.store().node_high_id(), added);
        self.reset(view, Source::Batch(batch));
    }

    pub(crate) fn init_batch(&mut self, view: ReadView, batch: ScanBatch) {
        self.reset(view, Source::Batch(batch));
    }

    fn reset(&mut self, view: ReadView, source: Source) {
        view.metrics().cursor_initialized("node");
        self.source = source;
        self.current = NO_ID;
        self.labels.clear();
        self.state = CursorState::Unpositioned;
        self.view = Some(view);
    }

    fn positioned(&self) -> &ReadView {
        assert_positioned(self.state, "node");
        match &self.view {
            Some(view) => view,
            None => unreachable!("positioned node cursor has a view"),
        }
    }

    /// Reference of the current node.
    pub fn node_reference(&self) -> i64 {
        self.positioned();
        self.current
    }

    /// Labels of the current node, ascending.
    pub fn labels(&self) -> &[LabelId] {
        self.positioned();
        &self.labels
    }

    /// Whether the current node carries `label`.
    pub fn has_label(&self, label: LabelId) -> bool {
        self.positioned();
        self.labels.binary_search(&label).is_ok()
    }

    /// Whether the current node has any property.
    pub fn has_properties(&self) -> bool {
        self.positioned().as_ref().node_has_properties(self.current)
    }

    /// Value of one property of the current node, if present.
    pub fn property_value(&self, key: PropertyKeyId) -> Option<&Value> {
        self.positioned().as_ref().node_property(self.current, key)
    }

    /// Reference to the committed properties of the current node.
    pub fn properties_reference(&self) -> PropertiesReference {
        let view = self.positioned().as_ref();
        view.store_node(self.current)
            .map_or(PropertiesReference::NONE, |n| PropertiesReference(n.properties))
    }

    /// Reference to the committed relationships of the current node.
    pub fn relationships_reference(&self) -> RelationshipsReference {
        let view = self.positioned().as_ref();
        match view.store_node(self.current).map(|n| &n.adjacency) {
            Some(Adjacency::Sparse { chain }) if !chain.is_empty() => {
                RelationshipsReference(RelationshipsRef::Chain)
            }
            Some(Adjacency::Dense { first_group }) => {
                RelationshipsReference(RelationshipsRef::Groups {
                    first_group: *first_group,
                })
            }
            _ => RelationshipsReference::NONE,
        }
    }

    /// Whether per-type degrees come from stored group counts rather than a
    /// chain walk.
    pub fn supports_fast_degree_lookup(&self) -> bool {
        let view = self.positioned().as_ref();
        view.store_node(self.current).is_some_and(|n| n.is_dense())
    }

    /// Positions `cursor` over the current node's properties.
    pub fn properties(&self, cursor: &mut PropertyCursor) {
        self.properties_with(cursor, PropertySelection::All);
    }

    /// Positions `cursor` over the selected properties of the current node.
    pub fn properties_with(&self, cursor: &mut PropertyCursor, selection: PropertySelection) {
        let reference = self.properties_reference();
        cursor.init(
            self.positioned().clone(),
            PropertyOwner::Node(self.current),
            reference,
            selection,
        );
    }

    /// Positions `cursor` over the current node's relationships passing
    /// `selection`.
    pub fn relationships(
        &self,
        cursor: &mut RelationshipTraversalCursor,
        selection: &RelationshipSelection,
    ) {
        let reference = self.relationships_reference();
        cursor.init(self.positioned().clone(), self.current, reference, selection);
    }

    /// Positions `cursor` over the current node's relationship groups.
    pub fn relationship_groups(&self, cursor: &mut RelationshipGroupCursor) {
        let reference = self.relationships_reference();
        cursor.init(self.positioned().clone(), self.current, reference);
    }

    /// Per-type degrees of the current node restricted to `selection`.
    pub fn degrees(&self, selection: &RelationshipSelection) -> Degrees {
        let reference = self.relationships_reference();
        let mut groups = Vec::new();
        collect_groups(self.positioned().as_ref(), self.current, reference, &mut groups);
        Degrees::from_groups(&groups, selection)
    }
}

impl Cursor for NodeCursor {
    fn next(&mut self) -> bool {
        let found = match (&self.view, &mut self.source) {
            (Some(view), Source::Single { id, done }) => {
                let exists = !*done && view.as_ref().node_exists(*id);
                *done = true;
                exists.then_some(*id)
            }
            (Some(view), Source::Batch(batch)) => {
                let merged = view.as_ref();
                loop {
                    match batch.next_id() {
                        Some(id) if merged.node_exists(id) => break Some(id),
                        Some(_) => continue,
                        None => break None,
                    }
                }
            }
            _ => None,
        };
        match (found, &self.view) {
            (Some(id), Some(view)) => {
                view.as_ref().node_labels(id, &mut self.labels);
                self.current = id;
                self.state = CursorState::Positioned;
                true
            }
            _ => {
                self.state = CursorState::Exhausted;
                self.view = None;
                self.labels.clear();
                false
            }
        }
    }

    fn close(&mut self) {
        self.view = None;
        self.source = Source::None;
        self.current = NO_ID;
        self.labels.clear();
        self.state = CursorState::Unpositioned;
    }

    fn state(&self) -> CursorState {
        self.state
    }
}
