//! Decision validation
//!
//! Checks a decision record against the schema, field by field in
//! declaration order. Strict mode raises on the first failure; loose
//! mode drops the offending field from the cleaned record and appends a
//! warning. Extra keys the schema does not name pass through untouched,
//! so host functions can read identifiers the schema never declared.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::config::Mode;
use crate::errors::Error;
use crate::schema::ast::{FieldDefinition, SchemaType};
use crate::schema::symbols::SymbolTable;
use crate::types::TypeRegistry;
use crate::value::{Decision, compare, loose_eq};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap());
static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})?$").unwrap()
});

#[derive(Debug, Clone)]
pub struct DecisionValidator {
    symbols: Arc<SymbolTable>,
    types: Arc<TypeRegistry>,
    mode: Mode,
}

impl DecisionValidator {
    pub fn new(symbols: Arc<SymbolTable>, types: Arc<TypeRegistry>, mode: Mode) -> Self {
        Self {
            symbols,
            types,
            mode,
        }
    }

    /// Returns the cleaned record and any loose-mode warnings.
    pub fn validate(&self, decision: &Decision) -> Result<(Decision, Vec<String>), Error> {
        let mut cleaned = Decision::new();
        let mut warnings = Vec::new();

        for field in self.symbols.top_level_fields() {
            match decision.get(&field.name) {
                None => {
                    if !field.optional {
                        self.reject(
                            field,
                            format!("required field '{}' is missing", field.name),
                            &mut warnings,
                        )?;
                    }
                }
                Some(Value::Null) => {
                    if !field.optional {
                        self.reject(
                            field,
                            format!("field '{}' expected {}, got null", field.name, field.type_name),
                            &mut warnings,
                        )?;
                    }
                }
                Some(value) => {
                    if let Some(message) = self.check_value(field, value) {
                        self.reject(field, message, &mut warnings)?;
                    } else {
                        cleaned.insert(field.name.clone(), value.clone());
                    }
                }
            }
        }

        // Pass through keys the schema does not name.
        for (key, value) in decision {
            if !cleaned.contains_key(key) && self.symbols.field(key).is_none() {
                cleaned.insert(key.clone(), value.clone());
            }
        }

        Ok((cleaned, warnings))
    }

    fn reject(
        &self,
        field: &FieldDefinition,
        message: String,
        warnings: &mut Vec<String>,
    ) -> Result<(), Error> {
        if self.mode == Mode::Strict {
            return Err(Error::DecisionValidation {
                field: field.name.clone(),
                message,
            });
        }
        warn!(field = %field.name, "dropping field from decision: {message}");
        warnings.push(message);
        Ok(())
    }

    /// Base-type check, alias validation, then constraints. Returns the
    /// failure message, if any.
    fn check_value(&self, field: &FieldDefinition, value: &Value) -> Option<String> {
        let type_error = || {
            Some(format!(
                "field '{}' expected {}, got {}",
                field.name,
                field.type_name,
                crate::value::type_name(value)
            ))
        };
        match field.schema_type {
            SchemaType::Int if value.as_i64().is_none() && value.as_u64().is_none() => {
                return type_error();
            }
            SchemaType::Float if !value.is_number() => return type_error(),
            SchemaType::Str if !value.is_string() => return type_error(),
            SchemaType::Bool if !value.is_boolean() => return type_error(),
            SchemaType::List if !value.is_array() => return type_error(),
            SchemaType::Custom => {
                if self.symbols.is_struct(&field.type_name) {
                    if !value.is_object() {
                        return type_error();
                    }
                } else if !self.types.validate_value(&field.type_name, value) {
                    return Some(format!(
                        "field '{}' is not a valid {}",
                        field.name, field.type_name
                    ));
                }
            }
            _ => {}
        }
        check_constraints(value, &field.constraints)
            .map(|violation| format!("field '{}' constraint violation: {violation}", field.name))
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn check_constraints(value: &Value, constraints: &BTreeMap<String, Value>) -> Option<String> {
    for (key, expected) in constraints {
        if let Some(violation) = check_constraint(key, value, expected) {
            return Some(violation);
        }
    }
    None
}

fn check_constraint(key: &str, value: &Value, expected: &Value) -> Option<String> {
    use std::cmp::Ordering;

    match key {
        "min" => (!ordered(value, expected, |o| o != Ordering::Less))
            .then(|| format!("value below min {expected}")),
        "max" => (!ordered(value, expected, |o| o != Ordering::Greater))
            .then(|| format!("value above max {expected}")),
        "exclusiveMin" => (!ordered(value, expected, |o| o == Ordering::Greater))
            .then(|| format!("value not above exclusiveMin {expected}")),
        "exclusiveMax" => (!ordered(value, expected, |o| o == Ordering::Less))
            .then(|| format!("value not below exclusiveMax {expected}")),
        "minLength" | "minItems" => check_length(key, value, expected, |len, n| len >= n),
        "maxLength" | "maxItems" => check_length(key, value, expected, |len, n| len <= n),
        "exactLength" => check_length(key, value, expected, |len, n| len == n),
        "pattern" => check_pattern(value, expected),
        "oneOf" => match expected.as_array() {
            Some(options) if options.iter().any(|o| loose_eq(o, value)) => None,
            _ => Some(format!("value not in {expected}")),
        },
        "const" => (!loose_eq(value, expected)).then(|| format!("value must equal {expected}")),
        "unique" => check_unique(value, expected),
        "format" => check_format(value, expected),
        // Unknown constraint keys are ignored.
        _ => None,
    }
}

/// True when the value orders against the bound and the ordering
/// satisfies the predicate.
fn ordered(value: &Value, bound: &Value, ok: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    compare(value, bound).is_some_and(ok)
}

fn check_length(
    key: &str,
    value: &Value,
    expected: &Value,
    ok: impl Fn(usize, usize) -> bool,
) -> Option<String> {
    let Some(len) = length_of(value) else {
        return Some(format!("{key} applies to strings and lists"));
    };
    let Some(n) = expected.as_u64() else {
        return Some(format!("{key} requires a non-negative integer bound"));
    };
    (!ok(len, n as usize)).then(|| format!("length {len} violates {key} {n}"))
}

fn check_pattern(value: &Value, pattern: &Value) -> Option<String> {
    let (Some(s), Some(p)) = (value.as_str(), pattern.as_str()) else {
        return Some("pattern applies to strings only".to_string());
    };
    match Regex::new(&format!("^(?:{p})$")) {
        Ok(re) if re.is_match(s) => None,
        Ok(_) => Some(format!("value does not match pattern '{p}'")),
        Err(_) => Some(format!("invalid pattern '{p}'")),
    }
}

fn check_unique(value: &Value, expected: &Value) -> Option<String> {
    if expected != &Value::Bool(true) {
        return None;
    }
    let items = value.as_array()?;
    for (i, a) in items.iter().enumerate() {
        if items[i + 1..].contains(a) {
            return Some("list elements must be unique".to_string());
        }
    }
    None
}

fn check_format(value: &Value, tag: &Value) -> Option<String> {
    let (Some(s), Some(tag)) = (value.as_str(), tag.as_str()) else {
        return None;
    };
    let ok = match tag {
        "date" => DATE_RE.is_match(s),
        "time" => TIME_RE.is_match(s),
        "date-time" => DATE_TIME_RE.is_match(s),
        // Unknown tags are implementer-defined; accept them.
        _ => true,
    };
    (!ok).then(|| format!("value does not match format '{tag}'"))
}
