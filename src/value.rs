//! Runtime value helpers
//!
//! Decisions and every intermediate expression result are `serde_json`
//! values. This module centralizes the small amount of value semantics
//! the engine needs: truthiness, numeric-aware equality and ordering,
//! and type-name reporting for error messages.

use std::cmp::Ordering;

use serde_json::Value;

/// A decision record: field name to value. Extra keys beyond the schema
/// are allowed and pass through validation untouched.
pub type Decision = serde_json::Map<String, Value>;

/// Truthiness used by the matcher and by loose-mode rule results.
/// Empty strings, empty collections, zero, and null are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// The engine-facing type name of a value, for diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_f64() => "Float",
        Value::Number(_) => "Int",
        Value::String(_) => "Str",
        Value::Array(_) => "List",
        Value::Object(_) => "Struct",
    }
}

/// Numeric view of a value. Booleans are not numbers.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Equality with cross-representation numeric comparison: `1` equals
/// `1.0`. Everything else falls back to structural equality.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering for the comparison operators. Numbers compare numerically
/// across integer/float representations, strings lexicographically,
/// booleans as false < true. Mixed kinds do not order.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => as_f64(a)?.partial_cmp(&as_f64(b)?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
