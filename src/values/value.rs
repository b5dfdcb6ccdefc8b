//! Property values stored on nodes and relationships.
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use super::category::ValueCategory;
use super::compare;
use super::duration::DurationValue;
use super::point::Point;
use crate::error::{KernelError, Result};

/// Typed property value tagged with explicit type information.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    /// Absence of a value; never stored.
    #[default]
    NoValue,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Calendar date.
    Date(Date),
    /// Time of day without offset.
    LocalTime(Time),
    /// Date and time without offset.
    LocalDateTime(PrimitiveDateTime),
    /// Date and time with a UTC offset.
    DateTime(OffsetDateTime),
    /// Calendar-aware duration.
    Duration(DurationValue),
    /// Spatial point.
    Point(Point),
    /// Homogeneous array.
    Array(ArrayValue),
}

impl Value {
    /// Category used by the global comparator and index predicates.
    pub fn category(&self) -> ValueCategory {
        match self {
            Value::NoValue => ValueCategory::NoValue,
            Value::Bool(_) => ValueCategory::Boolean,
            Value::Int(_) | Value::Float(_) => ValueCategory::Number,
            Value::Text(_) => ValueCategory::Text,
            Value::Date(_) => ValueCategory::Date,
            Value::LocalTime(_) => ValueCategory::LocalTime,
            Value::LocalDateTime(_) => ValueCategory::LocalDateTime,
            Value::DateTime(_) => ValueCategory::ZonedDateTime,
            Value::Duration(_) => ValueCategory::Duration,
            Value::Point(_) => ValueCategory::Geometry,
            Value::Array(array) => array.category(),
        }
    }

    /// Returns `true` for [`Value::NoValue`].
    pub fn is_no_value(&self) -> bool {
        matches!(self, Value::NoValue)
    }

    /// Text payload, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Point payload, if this is a point.
    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Value::Point(p) => Some(p),
            _ => None,
        }
    }

    /// Semantic equality: numbers compare by exact magnitude across integer
    /// and float, `NaN` equals nothing, values of different categories are
    /// never equal.
    pub fn equals(&self, other: &Value) -> bool {
        compare::values_equal(self, other)
    }

    /// Same representation and equal: `Int(1)` and `Float(1.0)` are equal but
    /// not identical. Writing an identical value over a property is a no-op.
    pub fn identical(&self, other: &Value) -> bool {
        compare::values_identical(self, other)
    }

    /// Position in the total order over all values.
    pub fn compare(&self, other: &Value) -> Ordering {
        compare::compare_values(self, other)
    }

    /// Homogeneous array from a list of scalars.
    pub fn array<I, V>(items: I) -> Result<Value>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ArrayValue::new(items.into_iter().map(Into::into).collect()).map(Value::Array)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

/// Array whose elements all belong to one scalar category.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawArray")]
pub struct ArrayValue {
    element: ValueCategory,
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct RawArray {
    element: ValueCategory,
    items: Vec<Value>,
}

impl TryFrom<RawArray> for ArrayValue {
    type Error = KernelError;

    fn try_from(raw: RawArray) -> Result<Self> {
        if raw.items.is_empty() {
            return ArrayValue::empty(raw.element);
        }
        let array = ArrayValue::new(raw.items)?;
        if array.element != raw.element {
            return Err(KernelError::InvalidArgument(format!(
                "array declared as {:?} holds {:?}",
                raw.element, array.element
            )));
        }
        Ok(array)
    }
}

impl ArrayValue {
    /// Builds an array, rejecting empty, mixed, nested or `NoValue` elements.
    pub fn new(items: Vec<Value>) -> Result<Self> {
        let Some(first) = items.first() else {
            return Err(KernelError::InvalidArgument(
                "empty arrays need an explicit element category".into(),
            ));
        };
        let element = first.category();
        if element.array_of().is_none() {
            return Err(KernelError::InvalidArgument(format!(
                "{element:?} cannot be an array element"
            )));
        }
        if let Some(odd) = items.iter().find(|item| item.category() != element) {
            return Err(KernelError::InvalidArgument(format!(
                "array of {element:?} cannot hold {:?}",
                odd.category()
            )));
        }
        Ok(Self { element, items })
    }

    /// Empty array of the given scalar category.
    pub fn empty(element: ValueCategory) -> Result<Self> {
        if element.array_of().is_none() {
            return Err(KernelError::InvalidArgument(format!(
                "{element:?} cannot be an array element"
            )));
        }
        Ok(Self {
            element,
            items: Vec::new(),
        })
    }

    /// Array category of this value.
    pub fn category(&self) -> ValueCategory {
        self.element.array_of().unwrap_or(ValueCategory::NoValue)
    }

    /// Scalar category of the elements.
    pub fn element_category(&self) -> ValueCategory {
        self.element
    }

    /// Elements in order.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NoValue => f.write_str("NO_VALUE"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::LocalTime(v) => write!(f, "{v}"),
            Value::LocalDateTime(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Duration(v) => write!(f, "{v}"),
            Value::Point(v) => write!(f, "{v}"),
            Value::Array(array) => {
                f.write_str("[")?;
                for (i, item) in array.items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::Date(value)
    }
}

impl From<Time> for Value {
    fn from(value: Time) -> Self {
        Value::LocalTime(value)
    }
}

impl From<PrimitiveDateTime> for Value {
    fn from(value: PrimitiveDateTime) -> Self {
        Value::LocalDateTime(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<DurationValue> for Value {
    fn from(value: DurationValue) -> Self {
        Value::Duration(value)
    }
}

impl From<Point> for Value {
    fn from(value: Point) -> Self {
        Value::Point(value)
    }
}

impl From<ArrayValue> for Value {
    fn from(value: ArrayValue) -> Self {
        Value::Array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::NoValue, Into::into)
    }
}
