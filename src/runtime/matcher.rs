//! Match policies
//!
//! Turns per-rule verdicts into a final [`MatchResult`]. Four modes:
//! `all` collects every truthy rule, `first` picks one by metadata
//! ordering, `inverse` collects falsy rules, and `score` aggregates
//! numeric contributions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{EnumString, IntoStaticStr};

use crate::value::{as_f64, truthy};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    First,
    Inverse,
    Score,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Aggregate {
    #[default]
    Sum,
}

/// Match policy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub mode: MatchMode,

    /// Rule-metadata field consulted by `first` for ordering.
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub order: SortOrder,

    #[serde(default)]
    pub aggregate: Aggregate,

    /// In `score` mode, a score at or above this populates `matched`.
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// Final verdict for one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub id: Option<Value>,
    pub matched: Vec<Value>,
    pub excluded: Vec<Value>,
    pub score: Option<f64>,
    pub warnings: Vec<String>,
}

/// One rule's verdict plus the metadata the matcher may consult.
pub struct RuleOutcome<'a> {
    pub rule_id: &'a Value,
    pub value: Value,
    pub metadata: &'a Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn process(
        &self,
        decision_id: Option<Value>,
        outcomes: &[RuleOutcome<'_>],
        warnings: Vec<String>,
    ) -> MatchResult {
        let mut result = MatchResult {
            id: decision_id,
            matched: vec![],
            excluded: vec![],
            score: None,
            warnings,
        };

        match self.config.mode {
            MatchMode::All => {
                result.matched = truthy_ids(outcomes);
            }
            MatchMode::First => {
                result.matched = self.pick_first(outcomes);
            }
            MatchMode::Inverse => {
                result.excluded = outcomes
                    .iter()
                    .filter(|o| !truthy(&o.value))
                    .map(|o| o.rule_id.clone())
                    .collect();
            }
            MatchMode::Score => {
                let score: f64 = outcomes.iter().map(|o| contribution(&o.value)).sum();
                result.score = Some(score);
                if let Some(threshold) = self.config.threshold
                    && score >= threshold
                {
                    result.matched = truthy_ids(outcomes);
                }
            }
        }
        result
    }

    /// Truthy rules sorted by the configured metadata key; absent or
    /// non-numeric values sort as +infinity. The sort is stable, so
    /// ties keep rule-definition order.
    fn pick_first(&self, outcomes: &[RuleOutcome<'_>]) -> Vec<Value> {
        let mut candidates: Vec<&RuleOutcome<'_>> =
            outcomes.iter().filter(|o| truthy(&o.value)).collect();
        if let Some(key) = &self.config.key {
            let sort_key = |o: &RuleOutcome<'_>| -> f64 {
                o.metadata.get(key).and_then(as_f64).unwrap_or(f64::INFINITY)
            };
            match self.config.order {
                SortOrder::Asc => candidates.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b))),
                SortOrder::Desc => candidates.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a))),
            }
        }
        candidates
            .first()
            .map(|o| o.rule_id.clone())
            .into_iter()
            .collect()
    }
}

fn truthy_ids(outcomes: &[RuleOutcome<'_>]) -> Vec<Value> {
    outcomes
        .iter()
        .filter(|o| truthy(&o.value))
        .map(|o| o.rule_id.clone())
        .collect()
}

/// Booleans contribute 1.0/0.0, numbers contribute as-is, anything
/// else contributes nothing.
fn contribution(value: &Value) -> f64 {
    match value {
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(_) => as_f64(value).unwrap_or(0.0),
        _ => 0.0,
    }
}
