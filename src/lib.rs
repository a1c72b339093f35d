//! rulegate: schema-first classification rules engine
//!
//! A schema declares the typed fields a decision may carry; named
//! boolean rules written in a small expression language are parsed,
//! type-checked, and compiled against that schema; compiled rule sets
//! evaluate decision records into match verdicts under a configurable
//! matching policy.

pub mod config;
pub mod engine;
pub mod errors;
pub mod operators;
pub mod rules;
pub mod runtime;
pub mod schema;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, Mode};
pub use engine::{Engine, EngineOptions, RuleDef, load_schema};
pub use errors::Error;
pub use operators::{OpKind, OpToken, OperatorDef, OperatorPreset, OperatorRegistry};
pub use rules::{CompiledRule, FunctionRegistry, HostFn};
pub use runtime::{CompiledRules, MatchConfig, MatchMode, MatchResult, SortOrder};
pub use schema::{SchemaAst, SymbolTable, parse_schema};
pub use types::{BaseType, TypeRegistry};
pub use value::Decision;
