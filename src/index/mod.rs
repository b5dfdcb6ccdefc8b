//! Index predicates, capabilities and the committed value-index structure.

mod capability;
mod query;
pub(crate) mod value_index;

pub use capability::{IndexCapability, IndexOrder, SortedIndexCapability, ValueCapability};
pub use query::{IndexQuery, IndexQueryType, RangePredicate};
