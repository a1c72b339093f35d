//! Runtime: decision validation, matching, and compiled-rule execution
//!
//! Everything here operates on frozen state. A [`CompiledRules`] set is
//! read-only and shareable across threads.

pub mod compiled;
pub mod matcher;
pub mod validator;

pub use compiled::CompiledRules;
pub use matcher::{Aggregate, MatchConfig, MatchMode, MatchResult, Matcher, RuleOutcome, SortOrder};
pub use validator::DecisionValidator;
