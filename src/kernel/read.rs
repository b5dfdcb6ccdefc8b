use smallvec::SmallVec;

use crate::cursor::{
    NodeCursor, NodeLabelIndexCursor, NodeValueIndexCursor, PropertiesReference, PropertyCursor,
    PropertyOwner, PropertySelection, RelationshipGroupCursor, RelationshipScanCursor,
    RelationshipSelection, RelationshipTraversalCursor, RelationshipsReference,
};
use crate::error::{KernelError, Result};
use crate::index::{IndexOrder, IndexQuery};
use crate::scan::Scan;
use crate::schema::IndexReference;
use crate::store::counts::RelationshipCountKey;
use crate::txstate::counts::compute_delta;
use crate::txstate::view::ReadView;
use crate::types::{LabelId, TypeId};
use crate::values::ValueCategory;

use super::transaction::Transaction;

/// How an index seek returns its results.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexQueryConstraints {
    order: IndexOrder,
    need_values: bool,
}

impl IndexQueryConstraints {
    /// Any order; values not returned.
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// Any order.
    pub fn unordered(need_values: bool) -> Self {
        Self {
            order: IndexOrder::None,
            need_values,
        }
    }

    /// Results in `order`.
    pub fn ordered(order: IndexOrder, need_values: bool) -> Self {
        Self { order, need_values }
    }

    /// Requested order.
    pub fn order(&self) -> IndexOrder {
        self.order
    }

    /// Whether the cursor should return indexed values.
    pub fn need_values(&self) -> bool {
        self.need_values
    }
}

/// Read operations of a transaction. Every operation initialises a cursor
/// (or answers directly) from the transaction's current view; the cursor
/// keeps that view after this handle is gone.
#[derive(Debug)]
pub struct DataRead<'t> {
    tx: &'t Transaction,
    stable: bool,
}

impl<'t> DataRead<'t> {
    pub(crate) fn new(tx: &'t Transaction, stable: bool) -> Self {
        Self { tx, stable }
    }

    fn view(&self) -> Result<ReadView> {
        self.tx.ensure_active()?;
        Ok(self.tx.read_view(self.stable))
    }

    /// Positions `cursor` to yield `node` if it exists.
    pub fn single_node(&self, node: i64, cursor: &mut NodeCursor) -> Result<()> {
        cursor.init_single(self.view()?, node);
        Ok(())
    }

    /// Positions `cursor` over every node.
    pub fn all_nodes_scan(&self, cursor: &mut NodeCursor) -> Result<()> {
        cursor.init_scan(self.view()?);
        Ok(())
    }

    /// Scan over every node for [`Scan::reserve_batch`] workers.
    pub fn all_nodes_scan_parallel(&self) -> Result<Scan<NodeCursor>> {
        let view = self.view()?;
        let store_high = view.store().node_high_id();
        let added = view
            .tx()
            .map(|tx| tx.added_nodes().iter().copied().collect())
            .unwrap_or_default();
        Ok(Scan::new(
            view,
            store_high,
            added,
            self.tx.kernel.options.parallel_batch_size,
            self.tx.termination_flag(),
        ))
    }

    /// Positions `cursor` to yield `relationship` if it exists.
    pub fn single_relationship(
        &self,
        relationship: i64,
        cursor: &mut RelationshipScanCursor,
    ) -> Result<()> {
        cursor.init_single(self.view()?, relationship);
        Ok(())
    }

    /// Positions `cursor` over every relationship.
    pub fn all_relationships_scan(&self, cursor: &mut RelationshipScanCursor) -> Result<()> {
        cursor.init_scan(self.view()?);
        Ok(())
    }

    /// Scan over every relationship for [`Scan::reserve_batch`] workers.
    pub fn all_relationships_scan_parallel(&self) -> Result<Scan<RelationshipScanCursor>> {
        let view = self.view()?;
        let store_high = view.store().relationship_high_id();
        let added = view
            .tx()
            .map(|tx| tx.added_relationships().iter().copied().collect())
            .unwrap_or_default();
        Ok(Scan::new(
            view,
            store_high,
            added,
            self.tx.kernel.options.parallel_batch_size,
            self.tx.termination_flag(),
        ))
    }

    /// Positions `cursor` over the relationships of `node` behind a
    /// reference captured earlier from a node or group cursor.
    pub fn relationships(
        &self,
        node: i64,
        reference: RelationshipsReference,
        selection: &RelationshipSelection,
        cursor: &mut RelationshipTraversalCursor,
    ) -> Result<()> {
        cursor.init(self.view()?, node, reference, selection);
        Ok(())
    }

    /// Positions `cursor` over the relationship groups of `node` behind a
    /// reference captured earlier from a node cursor.
    pub fn relationship_groups(
        &self,
        node: i64,
        reference: RelationshipsReference,
        cursor: &mut RelationshipGroupCursor,
    ) -> Result<()> {
        cursor.init(self.view()?, node, reference);
        Ok(())
    }

    /// Positions `cursor` over the properties of `node`.
    pub fn node_properties(
        &self,
        node: i64,
        reference: PropertiesReference,
        selection: PropertySelection,
        cursor: &mut PropertyCursor,
    ) -> Result<()> {
        cursor.init(self.view()?, PropertyOwner::Node(node), reference, selection);
        Ok(())
    }

    /// Positions `cursor` over the properties of `relationship`.
    pub fn relationship_properties(
        &self,
        relationship: i64,
        reference: PropertiesReference,
        selection: PropertySelection,
        cursor: &mut PropertyCursor,
    ) -> Result<()> {
        cursor.init(
            self.view()?,
            PropertyOwner::Relationship(relationship),
            reference,
            selection,
        );
        Ok(())
    }

    /// Positions `cursor` over nodes carrying `label`.
    pub fn node_label_scan(&self, label: LabelId, cursor: &mut NodeLabelIndexCursor) -> Result<()> {
        if label.is_any() {
            return Err(KernelError::InvalidArgument("label scan needs a concrete label".into()));
        }
        cursor.init(self.view()?, label);
        Ok(())
    }

    fn check_index(&self, index: &IndexReference, view: &ReadView) -> Result<()> {
        if view.store().value_index(index.id()).is_none() {
            return Err(KernelError::InvalidArgument(format!(
                "index {} was created after this transaction began",
                index.id()
            )));
        }
        Ok(())
    }

    fn check_order(
        index: &IndexReference,
        order: IndexOrder,
        categories: &[ValueCategory],
    ) -> Result<()> {
        if order == IndexOrder::None || categories.is_empty() {
            return Ok(());
        }
        if index.capability().order_capability(categories).contains(&order) {
            Ok(())
        } else {
            Err(KernelError::InvalidArgument(format!(
                "index {} cannot return {categories:?} in {order:?} order",
                index.id()
            )))
        }
    }

    /// Positions `cursor` over the entries of `index` accepted by every
    /// predicate. Predicates apply to the index keys in order, one each.
    pub fn node_index_seek(
        &self,
        index: &IndexReference,
        cursor: &mut NodeValueIndexCursor,
        constraints: IndexQueryConstraints,
        queries: &[IndexQuery],
    ) -> Result<()> {
        if queries.len() != index.keys().len() {
            return Err(KernelError::InvalidArgument(format!(
                "index {} has {} keys but {} predicates were given",
                index.id(),
                index.keys().len(),
                queries.len()
            )));
        }
        if let Some((query, key)) = queries
            .iter()
            .zip(index.keys())
            .find(|(q, k)| q.key() != **k)
        {
            return Err(KernelError::InvalidArgument(format!(
                "predicate on key {} does not match index key {key}",
                query.key()
            )));
        }
        let categories: SmallVec<[ValueCategory; 2]> =
            queries.iter().filter_map(IndexQuery::value_category).collect();
        Self::check_order(index, constraints.order, &categories)?;
        let view = self.view()?;
        self.check_index(index, &view)?;
        cursor.init(
            view,
            index.id(),
            queries,
            constraints.order,
            constraints.need_values,
        );
        Ok(())
    }

    /// Positions `cursor` over every entry of `index`.
    pub fn node_index_scan(
        &self,
        index: &IndexReference,
        cursor: &mut NodeValueIndexCursor,
        constraints: IndexQueryConstraints,
    ) -> Result<()> {
        let view = self.view()?;
        self.check_index(index, &view)?;
        cursor.init(view, index.id(), &[], constraints.order, constraints.need_values);
        Ok(())
    }

    /// Whether `node` exists for this transaction.
    pub fn node_exists(&self, node: i64) -> Result<bool> {
        let view = self.view()?;
        let exists = view.as_ref().node_exists(node);
        Ok(exists)
    }

    /// Whether `relationship` exists for this transaction.
    pub fn relationship_exists(&self, relationship: i64) -> Result<bool> {
        let view = self.view()?;
        let exists = view.as_ref().relationship_exists(relationship);
        Ok(exists)
    }

    /// Nodes carrying `label` (or every node for [`LabelId::ANY`]),
    /// including this transaction's changes.
    pub fn counts_for_node(&self, label: LabelId) -> Result<i64> {
        let view = self.view()?;
        let committed = view.store().counts.node(label);
        let delta = compute_delta(view.as_ref()).node(label);
        Ok(committed + delta)
    }

    /// Committed nodes carrying `label`, ignoring this transaction.
    pub fn counts_for_node_without_tx_state(&self, label: LabelId) -> Result<i64> {
        let view = self.view()?;
        Ok(view.store().counts.node(label))
    }

    fn relationship_key(start: LabelId, ty: TypeId, end: LabelId) -> Result<RelationshipCountKey> {
        if !start.is_any() && !end.is_any() {
            return Err(KernelError::Unsupported(
                "relationship counts with labels on both endpoints",
            ));
        }
        Ok(RelationshipCountKey { start, ty, end })
    }

    /// Relationships of type `ty` from nodes with `start` to nodes with `end`,
    /// including this transaction's changes. At most one endpoint label may
    /// be concrete.
    pub fn counts_for_relationship(&self, start: LabelId, ty: TypeId, end: LabelId) -> Result<i64> {
        let key = Self::relationship_key(start, ty, end)?;
        let view = self.view()?;
        let committed = view.store().counts.relationship(key);
        let delta = compute_delta(view.as_ref()).relationship(key);
        Ok(committed + delta)
    }

    /// Committed relationship count, ignoring this transaction.
    pub fn counts_for_relationship_without_tx_state(
        &self,
        start: LabelId,
        ty: TypeId,
        end: LabelId,
    ) -> Result<i64> {
        let key = Self::relationship_key(start, ty, end)?;
        let view = self.view()?;
        Ok(view.store().counts.relationship(key))
    }
}
