//! Standard operator presets
//!
//! The standard preset covers boolean connectives, comparisons, list
//! membership, and substring search. The minimal preset keeps only the
//! connectives; an explicit preset enables a chosen subset (the
//! connectives are always included as a floor).

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::Error;
use crate::operators::registry::{OpToken, OperatorDef, OperatorFn, OperatorRegistry};
use crate::value::{compare, loose_eq, truthy, type_name};

/// Which operators an engine starts with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PresetRepr", into = "PresetRepr")]
pub enum OperatorPreset {
    #[default]
    Standard,
    Minimal,
    /// The listed tokens, plus `and`/`or`/`not`.
    Explicit(Vec<String>),
}

/// Serde wire form: a preset name string or a token list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PresetRepr {
    Name(String),
    List(Vec<String>),
}

impl TryFrom<PresetRepr> for OperatorPreset {
    type Error = String;

    fn try_from(repr: PresetRepr) -> Result<Self, Self::Error> {
        match repr {
            PresetRepr::Name(name) => match name.as_str() {
                "standard" => Ok(OperatorPreset::Standard),
                "minimal" => Ok(OperatorPreset::Minimal),
                other => Err(format!(
                    "unknown operator preset '{other}' (expected 'standard', 'minimal', or a token list)"
                )),
            },
            PresetRepr::List(tokens) => Ok(OperatorPreset::Explicit(tokens)),
        }
    }
}

impl From<OperatorPreset> for PresetRepr {
    fn from(preset: OperatorPreset) -> Self {
        match preset {
            OperatorPreset::Standard => PresetRepr::Name("standard".to_string()),
            OperatorPreset::Minimal => PresetRepr::Name("minimal".to_string()),
            OperatorPreset::Explicit(tokens) => PresetRepr::List(tokens),
        }
    }
}

/// Tokens that are always present regardless of preset.
const LOGICAL_FLOOR: [&str; 3] = ["and", "or", "not"];

fn membership(args: &[Value]) -> Result<bool, Error> {
    let Value::Array(items) = &args[1] else {
        return Err(Error::rule_eval(format!(
            "'in' expects a list on the right, got {}",
            type_name(&args[1])
        )));
    };
    Ok(items.iter().any(|item| loose_eq(&args[0], item)))
}

fn ordering(token: &'static str, args: &[Value]) -> Result<Ordering, Error> {
    compare(&args[0], &args[1]).ok_or_else(|| {
        Error::rule_eval(format!(
            "cannot apply '{token}' to {} and {}",
            type_name(&args[0]),
            type_name(&args[1])
        ))
    })
}

fn cmp_fn(token: &'static str, accepts: fn(Ordering) -> bool) -> OperatorFn {
    Arc::new(move |args: &[Value]| Ok(json!(accepts(ordering(token, args)?))))
}

fn contains_fn() -> OperatorFn {
    Arc::new(|args: &[Value]| match (&args[0], &args[1]) {
        (Value::String(hay), Value::String(needle)) => Ok(json!(hay.contains(needle.as_str()))),
        _ => Err(Error::rule_eval(format!(
            "'contains' expects strings, got {} and {}",
            type_name(&args[0]),
            type_name(&args[1])
        ))),
    })
}

fn not_fn() -> OperatorFn {
    Arc::new(|args: &[Value]| Ok(json!(!truthy(&args[0]))))
}

fn symbol(s: &str) -> OpToken {
    OpToken::Symbol(s.to_string())
}

fn keyword(k: &str) -> OpToken {
    OpToken::Keyword(k.to_string())
}

fn all_defs() -> Vec<OperatorDef> {
    vec![
        // and/or carry no implementation: the compiler hard-codes their
        // short-circuit forms.
        OperatorDef::infix(keyword("or"), 10, &["Bool", "Bool"], "Bool", None),
        OperatorDef::infix(keyword("and"), 20, &["Bool", "Bool"], "Bool", None),
        OperatorDef::prefix(keyword("not"), 30, "Bool", "Bool", Some(not_fn())),
        OperatorDef::infix(
            keyword("in"),
            40,
            &["*", "List"],
            "Bool",
            Some(Arc::new(|args: &[Value]| Ok(json!(membership(args)?)))),
        ),
        OperatorDef::infix(
            keyword("not in"),
            40,
            &["*", "List"],
            "Bool",
            Some(Arc::new(|args: &[Value]| Ok(json!(!membership(args)?)))),
        ),
        OperatorDef::infix(
            symbol("="),
            40,
            &["*", "*"],
            "Bool",
            Some(Arc::new(|args: &[Value]| Ok(json!(loose_eq(&args[0], &args[1]))))),
        ),
        OperatorDef::infix(
            symbol("!="),
            40,
            &["*", "*"],
            "Bool",
            Some(Arc::new(|args: &[Value]| Ok(json!(!loose_eq(&args[0], &args[1]))))),
        ),
        OperatorDef::infix(symbol(">"), 40, &["*", "*"], "Bool", Some(cmp_fn(">", Ordering::is_gt))),
        OperatorDef::infix(symbol("<"), 40, &["*", "*"], "Bool", Some(cmp_fn("<", Ordering::is_lt))),
        OperatorDef::infix(symbol(">="), 40, &["*", "*"], "Bool", Some(cmp_fn(">=", Ordering::is_ge))),
        OperatorDef::infix(symbol("<="), 40, &["*", "*"], "Bool", Some(cmp_fn("<=", Ordering::is_le))),
        OperatorDef::infix(keyword("contains"), 40, &["Str", "Str"], "Bool", Some(contains_fn())),
    ]
}

/// Build a registry from a preset.
pub fn build_operator_registry(preset: &OperatorPreset) -> Result<OperatorRegistry, Error> {
    let enabled: Option<HashSet<&str>> = match preset {
        OperatorPreset::Standard => None,
        OperatorPreset::Minimal => Some(LOGICAL_FLOOR.into_iter().collect()),
        OperatorPreset::Explicit(tokens) => Some(
            tokens
                .iter()
                .map(|t| t.as_str())
                .chain(LOGICAL_FLOOR)
                .collect(),
        ),
    };
    let mut registry = OperatorRegistry::new();
    for def in all_defs() {
        if enabled
            .as_ref()
            .is_none_or(|set| set.contains(def.token.text()))
        {
            registry.register(def)?;
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(registry: &OperatorRegistry, token: &str, observed: &[&str], args: &[Value]) -> Value {
        let def = registry.lookup(token, observed).unwrap();
        def.func.as_ref().unwrap()(args).unwrap()
    }

    #[test]
    fn test_standard_preset_tokens() {
        let reg = build_operator_registry(&OperatorPreset::Standard).unwrap();
        for token in ["and", "or", "not", "in", "not in", "contains"] {
            assert!(reg.is_keyword(token), "missing keyword {token}");
        }
        for token in ["=", "!=", ">", "<", ">=", "<="] {
            assert!(reg.is_symbol(token), "missing symbol {token}");
        }
    }

    #[test]
    fn test_minimal_preset_tokens() {
        let reg = build_operator_registry(&OperatorPreset::Minimal).unwrap();
        assert!(reg.is_keyword("and"));
        assert!(reg.is_keyword("not"));
        assert!(!reg.is_keyword("in"));
        assert!(!reg.is_symbol("="));
    }

    #[test]
    fn test_explicit_preset_keeps_logical_floor() {
        let preset = OperatorPreset::Explicit(vec![">".to_string()]);
        let reg = build_operator_registry(&preset).unwrap();
        assert!(reg.is_symbol(">"));
        assert!(!reg.is_symbol("<"));
        assert!(reg.is_keyword("and"));
        assert!(reg.is_keyword("or"));
        assert!(reg.is_keyword("not"));
    }

    #[test]
    fn test_binding_powers() {
        let reg = build_operator_registry(&OperatorPreset::Standard).unwrap();
        assert_eq!(reg.binding_power("or"), Some(10));
        assert_eq!(reg.binding_power("and"), Some(20));
        assert_eq!(reg.binding_power("not"), Some(30));
        assert_eq!(reg.binding_power(">="), Some(40));
        assert_eq!(reg.binding_power("nonsense"), None);
    }

    #[test]
    fn test_membership() {
        let reg = build_operator_registry(&OperatorPreset::Standard).unwrap();
        let list = json!(["CA", "NY"]);
        assert_eq!(
            apply(&reg, "in", &["Str", "List"], &[json!("CA"), list.clone()]),
            json!(true)
        );
        assert_eq!(
            apply(&reg, "not in", &["Str", "List"], &[json!("TX"), list]),
            json!(true)
        );
    }

    #[test]
    fn test_membership_requires_list() {
        let reg = build_operator_registry(&OperatorPreset::Standard).unwrap();
        let def = reg.lookup("in", &["Str", "Str"]).unwrap();
        assert!(def.func.as_ref().unwrap()(&[json!("a"), json!("abc")]).is_err());
    }

    #[test]
    fn test_comparisons_cross_numeric() {
        let reg = build_operator_registry(&OperatorPreset::Standard).unwrap();
        assert_eq!(
            apply(&reg, ">", &["Int", "Float"], &[json!(2), json!(1.5)]),
            json!(true)
        );
        assert_eq!(
            apply(&reg, "=", &["Int", "Float"], &[json!(1), json!(1.0)]),
            json!(true)
        );
        assert_eq!(
            apply(&reg, "<=", &["Int", "Int"], &[json!(3), json!(3)]),
            json!(true)
        );
    }

    #[test]
    fn test_incomparable_types_error() {
        let reg = build_operator_registry(&OperatorPreset::Standard).unwrap();
        let def = reg.lookup(">", &["Str", "Int"]).unwrap();
        assert!(def.func.as_ref().unwrap()(&[json!("a"), json!(1)]).is_err());
    }

    #[test]
    fn test_contains_reads_left_contains_right() {
        let reg = build_operator_registry(&OperatorPreset::Standard).unwrap();
        assert_eq!(
            apply(
                &reg,
                "contains",
                &["Str", "Str"],
                &[json!("firewall"), json!("wall")]
            ),
            json!(true)
        );
    }

    #[test]
    fn test_preset_deserializes_from_name_or_list() {
        let preset: OperatorPreset = serde_json::from_value(json!("minimal")).unwrap();
        assert_eq!(preset, OperatorPreset::Minimal);
        let preset: OperatorPreset = serde_json::from_value(json!([">", "in"])).unwrap();
        assert_eq!(
            preset,
            OperatorPreset::Explicit(vec![">".to_string(), "in".to_string()])
        );
        assert!(serde_json::from_value::<OperatorPreset>(json!("bogus")).is_err());
    }
}
