//! Index and constraint registry plus the hook writes consult before they
//! touch labels or properties.
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::error::{KernelError, Result};
use crate::index::{IndexCapability, SortedIndexCapability};
use crate::types::{LabelId, PropertyKeyId};
use crate::values::Value;

/// Checks writes against schema rules before they are recorded.
///
/// A returned [`KernelError::ConstraintViolation`] is propagated unchanged
/// to the caller of the write and nothing is recorded.
pub trait ConstraintValidator: Send + Sync {
    /// Called before `key` is set to `value` on `node`, which carries `labels`.
    fn validate_node_property(
        &self,
        _node: i64,
        _labels: &[LabelId],
        _key: PropertyKeyId,
        _value: &Value,
    ) -> Result<()> {
        Ok(())
    }

    /// Called before `key` is removed from `node`, which carries `labels`.
    fn validate_node_property_removed(
        &self,
        _node: i64,
        _labels: &[LabelId],
        _key: PropertyKeyId,
    ) -> Result<()> {
        Ok(())
    }

    /// Called before `label` is added to `node`.
    fn validate_label_added(&self, _node: i64, _label: LabelId) -> Result<()> {
        Ok(())
    }
}

/// Validator that accepts every write.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoConstraints;

impl ConstraintValidator for NoConstraints {}

/// A value index over nodes with one label, keyed by one or more properties.
#[derive(Clone)]
pub struct IndexReference {
    id: u32,
    label: LabelId,
    keys: SmallVec<[PropertyKeyId; 2]>,
    capability: Arc<dyn IndexCapability>,
}

impl IndexReference {
    /// Registry id of the index.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Indexed label.
    pub fn label(&self) -> LabelId {
        self.label
    }

    /// Indexed property keys in index order.
    pub fn keys(&self) -> &[PropertyKeyId] {
        &self.keys
    }

    /// What the index can do for given value categories.
    pub fn capability(&self) -> &dyn IndexCapability {
        self.capability.as_ref()
    }
}

impl std::fmt::Debug for IndexReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexReference")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("keys", &self.keys)
            .finish()
    }
}

impl PartialEq for IndexReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.label == other.label && self.keys == other.keys
    }
}

/// Kind of schema constraint.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ConstraintKind {
    /// No two nodes with the label share the key values.
    Uniqueness,
    /// Every node with the label has the keys.
    Existence,
}

/// A schema constraint over nodes with one label.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConstraintDescriptor {
    /// Constrained label.
    pub label: LabelId,
    /// Constrained property keys.
    pub keys: SmallVec<[PropertyKeyId; 2]>,
    /// Constraint kind.
    pub kind: ConstraintKind,
}

impl ConstraintDescriptor {
    /// Uniqueness constraint over `keys` of nodes with `label`.
    pub fn uniqueness(label: LabelId, keys: &[PropertyKeyId]) -> Self {
        Self {
            label,
            keys: SmallVec::from_slice(keys),
            kind: ConstraintKind::Uniqueness,
        }
    }

    /// Existence constraint over `keys` of nodes with `label`.
    pub fn existence(label: LabelId, keys: &[PropertyKeyId]) -> Self {
        Self {
            label,
            keys: SmallVec::from_slice(keys),
            kind: ConstraintKind::Existence,
        }
    }
}

fn check_schema_keys(label: LabelId, keys: &[PropertyKeyId]) -> Result<()> {
    if label.is_any() {
        return Err(KernelError::InvalidArgument("schema label must be concrete".into()));
    }
    if keys.is_empty() {
        return Err(KernelError::InvalidArgument("schema needs at least one key".into()));
    }
    if keys.iter().any(|k| k.is_any()) {
        return Err(KernelError::InvalidArgument("schema keys must be concrete".into()));
    }
    let mut sorted: SmallVec<[PropertyKeyId; 4]> = SmallVec::from_slice(keys);
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(KernelError::InvalidArgument("schema keys must be distinct".into()));
    }
    Ok(())
}

/// Registered indexes and constraints.
#[derive(Default)]
pub struct SchemaRegistry {
    indexes: RwLock<Vec<IndexReference>>,
    constraints: RwLock<Vec<ConstraintDescriptor>>,
}

impl SchemaRegistry {
    /// Registers a sorted value index; fails if one already covers the same
    /// label and keys.
    pub fn index_create(&self, label: LabelId, keys: &[PropertyKeyId]) -> Result<IndexReference> {
        check_schema_keys(label, keys)?;
        let mut indexes = self.indexes.write();
        if indexes.iter().any(|i| i.label == label && i.keys.as_slice() == keys) {
            return Err(KernelError::InvalidArgument(format!(
                "index on label {label} keys {keys:?} already exists"
            )));
        }
        let id = u32::try_from(indexes.len())
            .map_err(|_| KernelError::InvalidArgument("index id space exhausted".into()))?;
        let index = IndexReference {
            id,
            label,
            keys: SmallVec::from_slice(keys),
            capability: Arc::new(SortedIndexCapability),
        };
        indexes.push(index.clone());
        Ok(index)
    }

    /// Index over exactly `label` and `keys`, in that key order.
    pub fn index_lookup(&self, label: LabelId, keys: &[PropertyKeyId]) -> Option<IndexReference> {
        self.indexes
            .read()
            .iter()
            .find(|i| i.label == label && i.keys.as_slice() == keys)
            .cloned()
    }

    /// Every registered index.
    pub fn indexes(&self) -> Vec<IndexReference> {
        self.indexes.read().clone()
    }

    /// Registers a constraint; fails if the same constraint exists.
    pub fn constraint_create(&self, descriptor: ConstraintDescriptor) -> Result<()> {
        check_schema_keys(descriptor.label, &descriptor.keys)?;
        let mut constraints = self.constraints.write();
        if constraints.contains(&descriptor) {
            return Err(KernelError::InvalidArgument(format!(
                "{:?} constraint on label {} already exists",
                descriptor.kind, descriptor.label
            )));
        }
        constraints.push(descriptor);
        Ok(())
    }

    /// Whether `descriptor` is registered.
    pub fn constraint_exists(&self, descriptor: &ConstraintDescriptor) -> bool {
        self.constraints.read().contains(descriptor)
    }

    /// Constraints over nodes with `label`.
    pub fn constraints_for_label(&self, label: LabelId) -> Vec<ConstraintDescriptor> {
        self.constraints
            .read()
            .iter()
            .filter(|c| c.label == label)
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("indexes", &self.indexes.read().len())
            .field("constraints", &self.constraints.read().len())
            .finish()
    }
}
