//! Value model: typed scalars and arrays with a total order.

mod category;
mod compare;
mod duration;
mod point;
mod value;

pub use category::ValueCategory;
pub use compare::{compare_values, values_equal};
pub use duration::DurationValue;
pub use point::{Crs, Point};
pub use value::{ArrayValue, Value};
