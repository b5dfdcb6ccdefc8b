//! Global value comparator and equality rules.
//!
//! Values order first by [`ValueCategory`], then naturally inside a category.
//! Integer/float comparisons are exact: a float that is not exactly an integer
//! never equals one, even when the integer rounds to it.
use std::cmp::Ordering;

use super::value::Value;

/// 2^63 as a float; the smallest float above every `i64`.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// Total order over all values.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (ca, cb) = (a.category(), b.category());
    if ca != cb {
        return ca.cmp(&cb);
    }
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => compare_numbers(a, b),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::LocalTime(x), Value::LocalTime(y)) => x.cmp(y),
        (Value::LocalDateTime(x), Value::LocalDateTime(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x
            .cmp(y)
            .then_with(|| x.offset().whole_seconds().cmp(&y.offset().whole_seconds())),
        (Value::Duration(x), Value::Duration(y)) => x.compare(y),
        (Value::Point(x), Value::Point(y)) => x.compare(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.items().iter().zip(y.items()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

/// Semantic equality used by `Exact` predicates and [`Value::equals`].
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
            !f.is_nan() && compare_int_float(*i, *f) == Ordering::Equal
        }
        (Value::Array(x), Value::Array(y)) => {
            x.category() == y.category()
                && x.len() == y.len()
                && x.items().iter().zip(y.items()).all(|(l, r)| values_equal(l, r))
        }
        (Value::Point(x), Value::Point(y)) => x.equals(y),
        (Value::NoValue, Value::NoValue) => true,
        _ => a.category() == b.category() && compare_values(a, b) == Ordering::Equal,
    }
}

/// Same variant and equal; floats compare by bit pattern.
pub fn values_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
        (Value::Array(x), Value::Array(y)) => {
            x.element_category() == y.element_category()
                && x.len() == y.len()
                && x.items().iter().zip(y.items()).all(|(l, r)| values_identical(l, r))
        }
        (Value::DateTime(x), Value::DateTime(y)) => x == y && x.offset() == y.offset(),
        _ => values_equal(a, b),
    }
}

/// Numeric order with `NaN` sorting after every other number.
pub fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => compare_floats(*x, *y),
        (Value::Int(i), Value::Float(f)) => compare_int_float(*i, *f),
        (Value::Float(f), Value::Int(i)) => compare_int_float(*i, *f).reverse(),
        _ => Ordering::Equal,
    }
}

fn compare_floats(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Compares an integer with a float without rounding either.
pub(crate) fn compare_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let truncated = f.trunc();
    // exact: |truncated| < 2^63 or truncated == -2^63
    let whole = truncated as i64;
    match i.cmp(&whole) {
        Ordering::Equal => {
            let fraction = f - truncated;
            if fraction > 0.0 {
                Ordering::Less
            } else if fraction < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        ord => ord,
    }
}
