use smallvec::{smallvec, SmallVec};

use crate::values::ValueCategory;

/// Whether an index can hand back the exact values it stores.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ValueCapability {
    /// Values for every requested category.
    Yes,
    /// Values for some of the requested categories.
    Partial,
    /// No values.
    No,
}

impl ValueCapability {
    /// Combines per-category answers.
    pub fn combine(self, other: ValueCapability) -> ValueCapability {
        match (self, other) {
            (ValueCapability::Yes, ValueCapability::Yes) => ValueCapability::Yes,
            (ValueCapability::No, ValueCapability::No) => ValueCapability::No,
            _ => ValueCapability::Partial,
        }
    }
}

/// Order an index seek may return entries in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum IndexOrder {
    /// Whatever order is cheapest.
    #[default]
    None,
    /// Ascending by the global value order.
    Ascending,
    /// Descending by the global value order.
    Descending,
}

/// Answers what an index can do for queries over the given value categories.
pub trait IndexCapability: Send + Sync {
    /// Orders supported for the categories, always including [`IndexOrder::None`].
    fn order_capability(&self, categories: &[ValueCategory]) -> SmallVec<[IndexOrder; 3]>;

    /// Whether values of the categories can be returned.
    fn value_capability(&self, categories: &[ValueCategory]) -> ValueCapability;
}

/// Capability of the built-in sorted value index: every category orders
/// except spatial ones, and every present value can be returned.
#[derive(Copy, Clone, Debug, Default)]
pub struct SortedIndexCapability;

impl IndexCapability for SortedIndexCapability {
    fn order_capability(&self, categories: &[ValueCategory]) -> SmallVec<[IndexOrder; 3]> {
        let spatial = categories
            .iter()
            .any(|c| matches!(c, ValueCategory::Geometry | ValueCategory::GeometryArray));
        if spatial || categories.is_empty() {
            smallvec![IndexOrder::None]
        } else {
            smallvec![IndexOrder::None, IndexOrder::Ascending, IndexOrder::Descending]
        }
    }

    fn value_capability(&self, categories: &[ValueCategory]) -> ValueCapability {
        categories
            .iter()
            .map(|c| match c {
                ValueCategory::NoValue => ValueCapability::No,
                _ => ValueCapability::Yes,
            })
            .reduce(ValueCapability::combine)
            .unwrap_or(ValueCapability::No)
    }
}
