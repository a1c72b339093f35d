//! Engine error taxonomy
//!
//! Every failure the engine can surface is a variant here. Compile-time
//! failures (schema, rules, freeze violations) propagate to the caller;
//! runtime evaluation failures are caught at the compiled-rule boundary
//! and downgraded to a falsy verdict.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Lex or parse failure in schema source text.
    #[error("schema parse error at line {line}: {message}")]
    SchemaParse { line: usize, message: String },

    /// Duplicate names, unknown type references, or circular structs.
    #[error("schema validation error: {message}")]
    SchemaValidation { message: String },

    /// Lex, parse, or type-resolution failure in rule text.
    #[error("rule parse error: {message}")]
    RuleParse { message: String },

    /// Internal: the compiler was handed a typed AST it cannot lower.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// Strict-mode decision validation failure. Carries the offending field.
    #[error("decision validation failed for field '{field}': {message}")]
    DecisionValidation { field: String, message: String },

    /// Missing field, missing function, or operator failure at runtime.
    #[error("rule evaluation error: {message}")]
    RuleEvaluation { message: String },

    /// A definition for this token with the same operand-type tuple (or a
    /// conflicting binding power) is already registered.
    #[error("operator conflict for '{token}': {message}")]
    OperatorConflict { token: String, message: String },

    /// Structural mutation attempted after the first compile or eval.
    #[error("engine is frozen; registration is not allowed after the first compile or eval")]
    EngineFrozen,
}

impl Error {
    pub(crate) fn rule_parse(message: impl Into<String>) -> Self {
        Error::RuleParse {
            message: message.into(),
        }
    }

    pub(crate) fn rule_eval(message: impl Into<String>) -> Self {
        Error::RuleEvaluation {
            message: message.into(),
        }
    }

    pub(crate) fn schema_validation(message: impl Into<String>) -> Self {
        Error::SchemaValidation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_structured_fields() {
        let err = Error::DecisionValidation {
            field: "amount".to_string(),
            message: "expected Int, got Str".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "decision validation failed for field 'amount': expected Int, got Str"
        );
    }

    #[test]
    fn test_variants_are_distinguishable() {
        let err = Error::rule_parse("unexpected token");
        assert!(matches!(err, Error::RuleParse { .. }));
        assert!(matches!(Error::EngineFrozen, Error::EngineFrozen));
    }
}
