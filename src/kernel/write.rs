use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{KernelError, Result};
use crate::store::records::{LabelSet, RelationshipData};
use crate::types::{LabelId, PropertyKeyId, RelationshipDirection, TypeId};
use crate::values::Value;

use super::transaction::Transaction;

/// Write operations of a transaction. Changes are recorded in the
/// transaction's mutation log and visible to its reads immediately.
#[derive(Debug)]
pub struct DataWrite<'t> {
    tx: &'t mut Transaction,
}

fn check_key(key: PropertyKeyId) -> Result<()> {
    if key.is_any() {
        return Err(KernelError::InvalidArgument(format!("illegal property key {key}")));
    }
    Ok(())
}

fn check_label(label: LabelId) -> Result<()> {
    if label.is_any() {
        return Err(KernelError::InvalidArgument(format!("illegal label {label}")));
    }
    Ok(())
}

fn check_value(value: &Value) -> Result<()> {
    if value.is_no_value() {
        return Err(KernelError::InvalidArgument(
            "cannot store NoValue; remove the property instead".into(),
        ));
    }
    Ok(())
}

impl<'t> DataWrite<'t> {
    pub(crate) fn new(tx: &'t mut Transaction) -> Self {
        Self { tx }
    }

    fn require_node(&self, node: i64) -> Result<()> {
        self.tx.ensure_active()?;
        if self.tx.view_ref().node_exists(node) {
            Ok(())
        } else {
            Err(KernelError::node_not_found(node))
        }
    }

    fn require_relationship(&self, relationship: i64) -> Result<RelationshipData> {
        self.tx.ensure_active()?;
        self.tx
            .view_ref()
            .relationship(relationship)
            .ok_or_else(|| KernelError::relationship_not_found(relationship))
    }

    /// Creates a node without labels and returns its reference.
    pub fn node_create(&mut self) -> Result<i64> {
        self.tx.ensure_active()?;
        let id = self.tx.kernel.allocate_node_id();
        self.tx.state_mut().node_do_create(id);
        Ok(id)
    }

    /// Creates a node carrying `labels` and returns its reference.
    pub fn node_create_with_labels(&mut self, labels: &[LabelId]) -> Result<i64> {
        self.tx.ensure_active()?;
        for label in labels {
            check_label(*label)?;
        }
        let id = self.tx.kernel.allocate_node_id();
        for label in labels {
            self.tx.kernel.validator.validate_label_added(id, *label)?;
        }
        let state = self.tx.state_mut();
        state.node_do_create(id);
        for label in labels {
            state.node_do_add_label(id, *label);
        }
        Ok(id)
    }

    /// Deletes `node`. Returns `false` if it does not exist; fails if it
    /// still has relationships.
    pub fn node_delete(&mut self, node: i64) -> Result<bool> {
        self.tx.ensure_active()?;
        let view = self.tx.view_ref();
        if !view.node_exists(node) {
            return Ok(false);
        }
        if view.node_has_relationships(node) {
            return Err(KernelError::ConstraintViolation(format!(
                "node {node} still has relationships; delete them first"
            )));
        }
        self.tx.state_mut().node_do_delete(node);
        Ok(true)
    }

    /// Deletes `node` and every relationship attached to it. Returns how many
    /// relationships were deleted.
    pub fn node_detach_delete(&mut self, node: i64) -> Result<usize> {
        self.tx.ensure_active()?;
        let view = self.tx.view_ref();
        if !view.node_exists(node) {
            return Ok(0);
        }
        let mut attached = BTreeSet::new();
        if let Some(state) = view.node_state(node) {
            for (_, ids) in state.added_relationships.iter() {
                for direction in [
                    RelationshipDirection::Outgoing,
                    RelationshipDirection::Incoming,
                    RelationshipDirection::Loop,
                ] {
                    attached.extend(ids.get(direction).iter().copied());
                }
            }
        }
        if view.store_node(node).is_some() {
            view.store.for_each_relationship(node, |rel| {
                if !view.relationship_is_deleted(rel) {
                    attached.insert(rel);
                }
            });
        }
        let doomed: Vec<(i64, RelationshipData)> = attached
            .into_iter()
            .filter_map(|rel| view.relationship(rel).map(|data| (rel, data)))
            .collect();
        let state = self.tx.state_mut();
        for (rel, data) in &doomed {
            state.relationship_do_delete(*rel, *data);
        }
        state.node_do_delete(node);
        Ok(doomed.len())
    }

    /// Creates a relationship of type `ty` from `source` to `target`.
    pub fn relationship_create(&mut self, source: i64, ty: TypeId, target: i64) -> Result<i64> {
        self.require_node(source)?;
        self.require_node(target)?;
        if ty.is_any() {
            return Err(KernelError::InvalidArgument(format!("illegal relationship type {ty}")));
        }
        let id = self.tx.kernel.allocate_relationship_id();
        self.tx
            .state_mut()
            .relationship_do_create(id, RelationshipData { ty, source, target });
        Ok(id)
    }

    /// Deletes `relationship`. Returns `false` if it does not exist.
    pub fn relationship_delete(&mut self, relationship: i64) -> Result<bool> {
        self.tx.ensure_active()?;
        let Some(data) = self.tx.view_ref().relationship(relationship) else {
            return Ok(false);
        };
        self.tx.state_mut().relationship_do_delete(relationship, data);
        Ok(true)
    }

    /// Adds `label` to `node`. Returns whether the node changed.
    pub fn node_add_label(&mut self, node: i64, label: LabelId) -> Result<bool> {
        self.require_node(node)?;
        check_label(label)?;
        if self.tx.view_ref().node_has_label(node, label) {
            return Ok(false);
        }
        self.tx.kernel.validator.validate_label_added(node, label)?;
        self.tx.state_mut().node_do_add_label(node, label);
        Ok(true)
    }

    /// Removes `label` from `node`. Returns whether the node changed.
    pub fn node_remove_label(&mut self, node: i64, label: LabelId) -> Result<bool> {
        self.require_node(node)?;
        check_label(label)?;
        if !self.tx.view_ref().node_has_label(node, label) {
            return Ok(false);
        }
        self.tx.state_mut().node_do_remove_label(node, label);
        Ok(true)
    }

    /// Sets `key` on `node` and returns the previous value, or
    /// [`Value::NoValue`] if there was none.
    pub fn node_set_property(
        &mut self,
        node: i64,
        key: PropertyKeyId,
        value: Value,
    ) -> Result<Value> {
        self.require_node(node)?;
        check_key(key)?;
        check_value(&value)?;
        let view = self.tx.view_ref();
        let previous = view.node_property(node, key).cloned();
        if previous.as_ref().is_some_and(|p| p.identical(&value)) {
            return Ok(previous.unwrap_or_default());
        }
        let mut labels = LabelSet::new();
        view.node_labels(node, &mut labels);
        self.tx
            .kernel
            .validator
            .validate_node_property(node, &labels, key, &value)?;
        let store = Arc::clone(&self.tx.store);
        let committed = store.node(node).and_then(|n| store.property(n.properties, key));
        self.tx.state_mut().node_do_set_property(node, key, value, committed);
        Ok(previous.unwrap_or_default())
    }

    /// Removes `key` from `node` and returns the removed value, or
    /// [`Value::NoValue`] if there was none.
    pub fn node_remove_property(&mut self, node: i64, key: PropertyKeyId) -> Result<Value> {
        self.require_node(node)?;
        check_key(key)?;
        let view = self.tx.view_ref();
        let Some(previous) = view.node_property(node, key).cloned() else {
            return Ok(Value::NoValue);
        };
        let mut labels = LabelSet::new();
        view.node_labels(node, &mut labels);
        self.tx
            .kernel
            .validator
            .validate_node_property_removed(node, &labels, key)?;
        let in_store = view.store_node_property(node, key).is_some();
        self.tx.state_mut().node_do_remove_property(node, key, in_store);
        Ok(previous)
    }

    /// Sets `key` on `relationship` and returns the previous value, or
    /// [`Value::NoValue`] if there was none.
    pub fn relationship_set_property(
        &mut self,
        relationship: i64,
        key: PropertyKeyId,
        value: Value,
    ) -> Result<Value> {
        self.require_relationship(relationship)?;
        check_key(key)?;
        check_value(&value)?;
        let previous = self
            .tx
            .view_ref()
            .relationship_property(relationship, key)
            .cloned();
        if previous.as_ref().is_some_and(|p| p.identical(&value)) {
            return Ok(previous.unwrap_or_default());
        }
        let store = Arc::clone(&self.tx.store);
        let committed = if self.tx.view_ref().relationship_is_added(relationship) {
            None
        } else {
            store
                .relationship(relationship)
                .and_then(|r| store.property(r.properties, key))
        };
        self.tx
            .state_mut()
            .relationship_do_set_property(relationship, key, value, committed);
        Ok(previous.unwrap_or_default())
    }

    /// Removes `key` from `relationship` and returns the removed value, or
    /// [`Value::NoValue`] if there was none.
    pub fn relationship_remove_property(
        &mut self,
        relationship: i64,
        key: PropertyKeyId,
    ) -> Result<Value> {
        self.require_relationship(relationship)?;
        check_key(key)?;
        let view = self.tx.view_ref();
        let Some(previous) = view.relationship_property(relationship, key).cloned() else {
            return Ok(Value::NoValue);
        };
        let in_store = !view.relationship_is_added(relationship)
            && view.store_relationship_property(relationship, key).is_some();
        self.tx
            .state_mut()
            .relationship_do_remove_property(relationship, key, in_store);
        Ok(previous)
    }
}
