//! Compiled-rule set
//!
//! The product of `Engine::compile`: compiled rules in supply order,
//! the decision validator, the matcher, and the finalized function
//! registry. Read-only; evaluation never mutates shared state, so a
//! set can be shared freely across threads.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::Error;
use crate::rules::compiler::{CompiledRule, FunctionRegistry};
use crate::runtime::matcher::{MatchResult, Matcher, RuleOutcome};
use crate::runtime::validator::DecisionValidator;
use crate::value::Decision;

#[derive(Debug)]
pub(crate) struct CompiledEntry {
    pub compiled: CompiledRule,
    pub metadata: Map<String, Value>,
}

pub struct CompiledRules {
    entries: Vec<CompiledEntry>,
    validator: DecisionValidator,
    matcher: Matcher,
    functions: Arc<FunctionRegistry>,
}

impl std::fmt::Debug for CompiledRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRules")
            .field("entries", &self.entries)
            .field("matcher", &self.matcher)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl CompiledRules {
    pub(crate) fn new(
        entries: Vec<CompiledEntry>,
        validator: DecisionValidator,
        matcher: Matcher,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        Self {
            entries,
            validator,
            matcher,
            functions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate one decision. The `Err` case only carries strict-mode
    /// decision validation failures; rule evaluation itself is total.
    pub fn eval_single(&self, decision: &Decision) -> Result<MatchResult, Error> {
        let (cleaned, warnings) = self.validator.validate(decision)?;
        let outcomes: Vec<RuleOutcome<'_>> = self
            .entries
            .iter()
            .map(|entry| RuleOutcome {
                rule_id: &entry.compiled.rule_id,
                value: entry.compiled.evaluate(&cleaned, &self.functions),
                metadata: &entry.metadata,
            })
            .collect();
        let decision_id = decision.get("id").cloned();
        Ok(self.matcher.process(decision_id, &outcomes, warnings))
    }

    /// Evaluate a batch sequentially, preserving input order.
    pub fn eval(&self, decisions: &[Decision]) -> Result<Vec<MatchResult>, Error> {
        decisions.iter().map(|d| self.eval_single(d)).collect()
    }

    /// Dotted paths each rule references, in rule order.
    pub fn rule_variables(&self) -> Vec<(Value, Vec<String>)> {
        self.entries
            .iter()
            .map(|e| (e.compiled.rule_id.clone(), e.compiled.variables.clone()))
            .collect()
    }

    /// Function names each rule calls, in rule order.
    pub fn rule_functions(&self) -> Vec<(Value, Vec<String>)> {
        self.entries
            .iter()
            .map(|e| (e.compiled.rule_id.clone(), e.compiled.functions.clone()))
            .collect()
    }
}
