//! Operator definitions and lookup

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::Error;

/// Operator implementation. Binary operators receive `[left, right]`,
/// prefix operators receive `[operand]`. Failures surface as
/// `RuleEvaluation` and downgrade to a falsy verdict at the rule boundary.
pub type OperatorFn = Arc<dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync>;

/// An operator token is either a symbol (`>=`) or an identifier-shaped
/// keyword (`contains`). The tokenizer needs the distinction; lookup
/// does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpToken {
    Symbol(String),
    Keyword(String),
}

impl OpToken {
    pub fn text(&self) -> &str {
        match self {
            OpToken::Symbol(s) | OpToken::Keyword(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Prefix,
    Infix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    #[default]
    Left,
    Right,
}

/// A single operator definition. `func` is `None` only for `and`/`or`,
/// whose short-circuit semantics are hard-coded by the compiler.
#[derive(Clone)]
pub struct OperatorDef {
    pub token: OpToken,
    pub kind: OpKind,
    /// Expected operand type names; `*` matches any type.
    pub input_types: Vec<String>,
    pub return_type: String,
    pub binding_power: u8,
    pub associativity: Assoc,
    pub func: Option<OperatorFn>,
}

impl OperatorDef {
    pub fn infix(
        token: OpToken,
        binding_power: u8,
        input_types: &[&str],
        return_type: &str,
        func: Option<OperatorFn>,
    ) -> Self {
        Self {
            token,
            kind: OpKind::Infix,
            input_types: input_types.iter().map(|s| s.to_string()).collect(),
            return_type: return_type.to_string(),
            binding_power,
            associativity: Assoc::Left,
            func,
        }
    }

    pub fn prefix(
        token: OpToken,
        binding_power: u8,
        input_type: &str,
        return_type: &str,
        func: Option<OperatorFn>,
    ) -> Self {
        Self {
            token,
            kind: OpKind::Prefix,
            input_types: vec![input_type.to_string()],
            return_type: return_type.to_string(),
            binding_power,
            associativity: Assoc::Left,
            func,
        }
    }

    fn matches_exact(&self, observed: &[&str]) -> bool {
        self.input_types.len() == observed.len()
            && self.input_types.iter().zip(observed).all(|(e, o)| e == o)
    }

    fn matches_wildcard(&self, observed: &[&str]) -> bool {
        self.input_types.len() == observed.len()
            && self
                .input_types
                .iter()
                .zip(observed)
                .all(|(e, o)| e == "*" || e == o)
    }
}

impl fmt::Debug for OperatorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorDef")
            .field("token", &self.token)
            .field("kind", &self.kind)
            .field("input_types", &self.input_types)
            .field("return_type", &self.return_type)
            .field("binding_power", &self.binding_power)
            .finish_non_exhaustive()
    }
}

/// Registry keyed by token text. All definitions under one token share
/// a binding power; a conflicting power is rejected at registration.
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    by_token: HashMap<String, Vec<OperatorDef>>,
    symbols: HashSet<String>,
    keywords: HashSet<String>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, op: OperatorDef) -> Result<(), Error> {
        let token = op.token.text().to_string();
        if let Some(existing) = self.by_token.get(&token) {
            for def in existing {
                if def.input_types == op.input_types {
                    return Err(Error::OperatorConflict {
                        token,
                        message: format!(
                            "a definition with input types {:?} is already registered",
                            op.input_types
                        ),
                    });
                }
            }
            if let Some(first) = existing.first()
                && first.binding_power != op.binding_power
            {
                return Err(Error::OperatorConflict {
                    token,
                    message: format!(
                        "binding power {} conflicts with already-registered {}",
                        op.binding_power, first.binding_power
                    ),
                });
            }
        }
        match &op.token {
            OpToken::Symbol(s) => {
                self.symbols.insert(s.clone());
            }
            OpToken::Keyword(k) => {
                self.keywords.insert(k.clone());
            }
        }
        self.by_token.entry(token).or_default().push(op);
        Ok(())
    }

    /// Resolve a token against observed operand types: exact tuple match
    /// first, then wildcard-compatible match. A token with exactly one
    /// definition falls back to that definition.
    pub fn lookup(&self, token: &str, observed: &[&str]) -> Option<&OperatorDef> {
        let candidates = self.by_token.get(token)?;
        if let Some(def) = candidates.iter().find(|d| d.matches_exact(observed)) {
            return Some(def);
        }
        if let Some(def) = candidates.iter().find(|d| d.matches_wildcard(observed)) {
            return Some(def);
        }
        if candidates.len() == 1 {
            return candidates.first();
        }
        None
    }

    /// The prefix definition for a token, if it has one.
    pub fn prefix_def(&self, token: &str) -> Option<&OperatorDef> {
        self.by_token
            .get(token)?
            .iter()
            .find(|d| d.kind == OpKind::Prefix)
    }

    /// Binding power shared by all definitions under a token.
    pub fn binding_power(&self, token: &str) -> Option<u8> {
        self.by_token
            .get(token)
            .and_then(|defs| defs.first())
            .map(|d| d.binding_power)
    }

    /// Associativity shared by all definitions under a token.
    pub fn associativity(&self, token: &str) -> Option<Assoc> {
        self.by_token
            .get(token)
            .and_then(|defs| defs.first())
            .map(|d| d.associativity)
    }

    pub fn is_symbol(&self, token: &str) -> bool {
        self.symbols.contains(token)
    }

    pub fn is_keyword(&self, token: &str) -> bool {
        self.keywords.contains(token)
    }

    /// Symbol tokens the tokenizer must recognize.
    pub fn symbols(&self) -> &HashSet<String> {
        &self.symbols
    }

    /// Keyword tokens reserved from use as identifiers.
    pub fn keywords(&self) -> &HashSet<String> {
        &self.keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eq_def(input_types: &[&str]) -> OperatorDef {
        OperatorDef::infix(
            OpToken::Symbol("=".to_string()),
            40,
            input_types,
            "Bool",
            Some(Arc::new(|args: &[Value]| Ok(json!(args[0] == args[1])))),
        )
    }

    #[test]
    fn test_exact_match_preferred_over_wildcard() {
        let mut reg = OperatorRegistry::new();
        reg.register(eq_def(&["*", "*"])).unwrap();
        reg.register(eq_def(&["Str", "Str"])).unwrap();

        let def = reg.lookup("=", &["Str", "Str"]).unwrap();
        assert_eq!(def.input_types, vec!["Str", "Str"]);

        let def = reg.lookup("=", &["Int", "Int"]).unwrap();
        assert_eq!(def.input_types, vec!["*", "*"]);
    }

    #[test]
    fn test_single_definition_fallback() {
        let mut reg = OperatorRegistry::new();
        reg.register(eq_def(&["Str", "Str"])).unwrap();
        // No exact or wildcard match, but only one candidate exists.
        assert!(reg.lookup("=", &["Int", "Int"]).is_some());
    }

    #[test]
    fn test_no_fallback_with_multiple_definitions() {
        let mut reg = OperatorRegistry::new();
        reg.register(eq_def(&["Str", "Str"])).unwrap();
        reg.register(eq_def(&["Int", "Int"])).unwrap();
        assert!(reg.lookup("=", &["Bool", "Bool"]).is_none());
    }

    #[test]
    fn test_duplicate_tuple_conflicts() {
        let mut reg = OperatorRegistry::new();
        reg.register(eq_def(&["*", "*"])).unwrap();
        let err = reg.register(eq_def(&["*", "*"])).unwrap_err();
        assert!(matches!(err, Error::OperatorConflict { .. }));
    }

    #[test]
    fn test_binding_power_conflict_rejected() {
        let mut reg = OperatorRegistry::new();
        reg.register(eq_def(&["*", "*"])).unwrap();
        let mut other = eq_def(&["Str", "Str"]);
        other.binding_power = 50;
        let err = reg.register(other).unwrap_err();
        assert!(matches!(err, Error::OperatorConflict { .. }));
    }

    #[test]
    fn test_symbol_and_keyword_sets() {
        let mut reg = OperatorRegistry::new();
        reg.register(eq_def(&["*", "*"])).unwrap();
        reg.register(OperatorDef::infix(
            OpToken::Keyword("contains".to_string()),
            40,
            &["Str", "Str"],
            "Bool",
            None,
        ))
        .unwrap();

        assert!(reg.is_symbol("="));
        assert!(!reg.is_keyword("="));
        assert!(reg.is_keyword("contains"));
    }
}
