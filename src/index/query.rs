//! Index query predicates.
//!
//! An [`IndexQuery`] names one property key and decides, through
//! [`IndexQuery::accepts_value`], whether a stored value satisfies it. Every
//! predicate rejects [`Value::NoValue`].
use std::cmp::Ordering;
use std::fmt;

use crate::error::{KernelError, Result};
use crate::types::PropertyKeyId;
use crate::values::{compare_values, values_equal, Crs, Point, Value, ValueCategory};

/// Kind of an [`IndexQuery`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IndexQueryType {
    /// Property is present.
    Exists,
    /// Property equals a value.
    Exact,
    /// Property lies in a range.
    Range,
    /// Text starts with a prefix.
    StringPrefix,
    /// Text ends with a suffix.
    StringSuffix,
    /// Text contains a substring.
    StringContains,
}

/// Range part of an [`IndexQuery::Range`].
#[derive(Clone, Debug)]
pub enum RangePredicate {
    /// Bounds within one non-spatial category; missing bounds are open.
    Bounded {
        /// Category both bounds belong to.
        category: ValueCategory,
        /// Lower bound.
        from: Option<Value>,
        /// Whether the lower bound itself matches.
        from_inclusive: bool,
        /// Upper bound.
        to: Option<Value>,
        /// Whether the upper bound itself matches.
        to_inclusive: bool,
    },
    /// Bounding box in one coordinate reference system.
    Geometry {
        /// CRS shared by both bounds.
        crs: Crs,
        /// Lower corner.
        from: Option<Point>,
        /// Whether points on the lower corner's planes match.
        from_inclusive: bool,
        /// Upper corner.
        to: Option<Point>,
        /// Whether points on the upper corner's planes match.
        to_inclusive: bool,
    },
    /// Any value of the category.
    Category(ValueCategory),
    /// Any point of the CRS.
    Crs(Crs),
}

/// Predicate over a single indexed property.
#[derive(Clone, Debug)]
pub enum IndexQuery {
    /// Any value at all.
    Exists {
        /// Property key.
        key: PropertyKeyId,
    },
    /// Semantically equal to `value`.
    Exact {
        /// Property key.
        key: PropertyKeyId,
        /// Value to match.
        value: Value,
    },
    /// Inside a range.
    Range {
        /// Property key.
        key: PropertyKeyId,
        /// Range to match.
        range: RangePredicate,
    },
    /// Text starting with `prefix`.
    StringPrefix {
        /// Property key.
        key: PropertyKeyId,
        /// Required prefix.
        prefix: String,
    },
    /// Text ending with `suffix`.
    StringSuffix {
        /// Property key.
        key: PropertyKeyId,
        /// Required suffix.
        suffix: String,
    },
    /// Text containing `contains`.
    StringContains {
        /// Property key.
        key: PropertyKeyId,
        /// Required substring.
        contains: String,
    },
}

impl IndexQuery {
    /// Matches any present value.
    pub fn exists(key: PropertyKeyId) -> Self {
        IndexQuery::Exists { key }
    }

    /// Matches values equal to `value`.
    pub fn exact(key: PropertyKeyId, value: impl Into<Value>) -> Self {
        IndexQuery::Exact {
            key,
            value: value.into(),
        }
    }

    /// Range between two values of one category; `NoValue` means unbounded.
    ///
    /// Point bounds must share a CRS and produce a bounding-box predicate.
    /// At least one bound is required; use [`IndexQuery::range_over_category`]
    /// for a bare category.
    pub fn range(
        key: PropertyKeyId,
        from: impl Into<Value>,
        from_inclusive: bool,
        to: impl Into<Value>,
        to_inclusive: bool,
    ) -> Result<Self> {
        let from = Some(from.into()).filter(|v| !v.is_no_value());
        let to = Some(to.into()).filter(|v| !v.is_no_value());
        let category = match (&from, &to) {
            (None, None) => {
                return Err(KernelError::InvalidArgument(
                    "range query needs at least one bound".into(),
                ))
            }
            (Some(f), None) => f.category(),
            (None, Some(t)) => t.category(),
            (Some(f), Some(t)) => {
                if f.category() != t.category() {
                    return Err(KernelError::InvalidArgument(format!(
                        "range bounds mix {:?} and {:?}",
                        f.category(),
                        t.category()
                    )));
                }
                f.category()
            }
        };
        if category == ValueCategory::Geometry {
            let from = from.and_then(|v| v.as_point().cloned());
            let to = to.and_then(|v| v.as_point().cloned());
            let crs = match (&from, &to) {
                (Some(f), Some(t)) if f.crs() != t.crs() => {
                    return Err(KernelError::InvalidArgument(format!(
                        "range bounds mix {} and {}",
                        f.crs(),
                        t.crs()
                    )))
                }
                (Some(p), _) | (_, Some(p)) => p.crs(),
                (None, None) => unreachable!("at least one bound checked above"),
            };
            return Ok(IndexQuery::Range {
                key,
                range: RangePredicate::Geometry {
                    crs,
                    from,
                    from_inclusive,
                    to,
                    to_inclusive,
                },
            });
        }
        Ok(IndexQuery::Range {
            key,
            range: RangePredicate::Bounded {
                category,
                from,
                from_inclusive,
                to,
                to_inclusive,
            },
        })
    }

    /// Matches every value of `category`.
    pub fn range_over_category(key: PropertyKeyId, category: ValueCategory) -> Result<Self> {
        if category == ValueCategory::NoValue {
            return Err(KernelError::InvalidArgument(
                "cannot range over the absence of a value".into(),
            ));
        }
        Ok(IndexQuery::Range {
            key,
            range: RangePredicate::Category(category),
        })
    }

    /// Matches every point in `crs`.
    pub fn range_over_crs(key: PropertyKeyId, crs: Crs) -> Self {
        IndexQuery::Range {
            key,
            range: RangePredicate::Crs(crs),
        }
    }

    /// Matches text starting with `prefix`.
    pub fn string_prefix(key: PropertyKeyId, prefix: impl Into<String>) -> Self {
        IndexQuery::StringPrefix {
            key,
            prefix: prefix.into(),
        }
    }

    /// Matches text ending with `suffix`.
    pub fn string_suffix(key: PropertyKeyId, suffix: impl Into<String>) -> Self {
        IndexQuery::StringSuffix {
            key,
            suffix: suffix.into(),
        }
    }

    /// Matches text containing `contains`.
    pub fn string_contains(key: PropertyKeyId, contains: impl Into<String>) -> Self {
        IndexQuery::StringContains {
            key,
            contains: contains.into(),
        }
    }

    /// Property key the predicate applies to.
    pub fn key(&self) -> PropertyKeyId {
        match self {
            IndexQuery::Exists { key }
            | IndexQuery::Exact { key, .. }
            | IndexQuery::Range { key, .. }
            | IndexQuery::StringPrefix { key, .. }
            | IndexQuery::StringSuffix { key, .. }
            | IndexQuery::StringContains { key, .. } => *key,
        }
    }

    /// Kind of predicate.
    pub fn query_type(&self) -> IndexQueryType {
        match self {
            IndexQuery::Exists { .. } => IndexQueryType::Exists,
            IndexQuery::Exact { .. } => IndexQueryType::Exact,
            IndexQuery::Range { .. } => IndexQueryType::Range,
            IndexQuery::StringPrefix { .. } => IndexQueryType::StringPrefix,
            IndexQuery::StringSuffix { .. } => IndexQueryType::StringSuffix,
            IndexQuery::StringContains { .. } => IndexQueryType::StringContains,
        }
    }

    /// Category of values this predicate can match, when it is limited to one.
    pub fn value_category(&self) -> Option<ValueCategory> {
        match self {
            IndexQuery::Exists { .. } => None,
            IndexQuery::Exact { value, .. } => Some(value.category()),
            IndexQuery::Range { range, .. } => Some(match range {
                RangePredicate::Bounded { category, .. } => *category,
                RangePredicate::Category(category) => *category,
                RangePredicate::Geometry { .. } | RangePredicate::Crs(_) => ValueCategory::Geometry,
            }),
            IndexQuery::StringPrefix { .. }
            | IndexQuery::StringSuffix { .. }
            | IndexQuery::StringContains { .. } => Some(ValueCategory::Text),
        }
    }

    /// Whether `value` satisfies this predicate.
    pub fn accepts_value(&self, value: &Value) -> bool {
        if value.is_no_value() {
            return false;
        }
        match self {
            IndexQuery::Exists { .. } => true,
            IndexQuery::Exact { value: expected, .. } => values_equal(expected, value),
            IndexQuery::Range { range, .. } => range.accepts(value),
            IndexQuery::StringPrefix { prefix, .. } => {
                value.as_text().is_some_and(|s| s.starts_with(prefix.as_str()))
            }
            IndexQuery::StringSuffix { suffix, .. } => {
                value.as_text().is_some_and(|s| s.ends_with(suffix.as_str()))
            }
            IndexQuery::StringContains { contains, .. } => {
                value.as_text().is_some_and(|s| s.contains(contains.as_str()))
            }
        }
    }
}

impl RangePredicate {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            RangePredicate::Bounded {
                category,
                from,
                from_inclusive,
                to,
                to_inclusive,
            } => {
                if value.category() != *category {
                    return false;
                }
                if let Some(from) = from {
                    match compare_values(value, from) {
                        Ordering::Less => return false,
                        Ordering::Equal if !from_inclusive => return false,
                        _ => {}
                    }
                }
                if let Some(to) = to {
                    match compare_values(value, to) {
                        Ordering::Greater => return false,
                        Ordering::Equal if !to_inclusive => return false,
                        _ => {}
                    }
                }
                true
            }
            RangePredicate::Geometry {
                crs,
                from,
                from_inclusive,
                to,
                to_inclusive,
            } => value.as_point().is_some_and(|p| {
                p.crs() == *crs
                    && p.within_range(from.as_ref(), *from_inclusive, to.as_ref(), *to_inclusive)
            }),
            RangePredicate::Category(category) => value.category() == *category,
            RangePredicate::Crs(crs) => value.as_point().is_some_and(|p| p.crs() == *crs),
        }
    }
}

impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexQuery::Exists { key } => write!(f, "exists({key})"),
            IndexQuery::Exact { key, value } => write!(f, "exact({key}, {value})"),
            IndexQuery::Range { key, range } => write!(f, "range({key}, {range:?})"),
            IndexQuery::StringPrefix { key, prefix } => write!(f, "prefix({key}, {prefix:?})"),
            IndexQuery::StringSuffix { key, suffix } => write!(f, "suffix({key}, {suffix:?})"),
            IndexQuery::StringContains { key, contains } => {
                write!(f, "contains({key}, {contains:?})")
            }
        }
    }
}
