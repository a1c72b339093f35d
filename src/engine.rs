//! Engine facade
//!
//! Wires the registries, schema, and host functions together, and
//! enforces the freeze contract: registration is open until the first
//! `compile` or `eval`, after which only compilation and evaluation
//! remain available.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{EngineConfig, Mode};
use crate::errors::Error;
use crate::operators::{
    OperatorDef, OperatorPreset, OperatorRegistry, build_operator_registry,
};
use crate::rules::compiler::{FunctionRegistry, HostFn, compile_rule};
use crate::rules::optimizer;
use crate::rules::parser::{ParseContext, parse_rule};
use crate::runtime::compiled::{CompiledEntry, CompiledRules};
use crate::runtime::matcher::{MatchConfig, MatchResult, Matcher};
use crate::runtime::validator::DecisionValidator;
use crate::schema::{SymbolTable, parse_schema};
use crate::types::{BaseType, TypeRegistry, TypeValidator, register_builtin_types};
use crate::value::Decision;

/// A rule supplied to [`Engine::compile`]: id, expression text, and
/// arbitrary metadata the matcher may consult (e.g. `ordering`).
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
    pub id: Value,
    pub rule: String,
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl RuleDef {
    pub fn new(id: impl Into<Value>, rule: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rule: rule.into(),
            meta: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Construction options. Defaults: no host functions, strict rule
/// compilation, loose decision validation, standard operators.
pub struct EngineOptions {
    pub funcs: FunctionRegistry,
    pub rules_mode: Mode,
    pub decisions_mode: Mode,
    pub operators: OperatorPreset,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            funcs: FunctionRegistry::new(),
            rules_mode: Mode::Strict,
            decisions_mode: Mode::Loose,
            operators: OperatorPreset::Standard,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            funcs: FunctionRegistry::new(),
            rules_mode: config.engine.rules_mode,
            decisions_mode: config.engine.decisions_mode,
            operators: config.engine.operators.clone(),
        }
    }
}

pub struct Engine {
    types: TypeRegistry,
    operators: OperatorRegistry,
    symbols: Arc<SymbolTable>,
    functions: FunctionRegistry,
    rules_mode: Mode,
    decisions_mode: Mode,
    frozen: bool,
}

impl Engine {
    /// Parse and validate the schema, seed the built-in alias types,
    /// and build the operator registry from the preset.
    pub fn new(source: &str, options: EngineOptions) -> Result<Self, Error> {
        let ast = parse_schema(source)?;
        let mut types = TypeRegistry::new();
        register_builtin_types(&mut types);
        let operators = build_operator_registry(&options.operators)?;
        let aliases: HashSet<String> = types.registered_names().into_iter().collect();
        let symbols = Arc::new(SymbolTable::build(ast, aliases)?);
        debug!(
            fields = symbols.top_level_fields().len(),
            "schema loaded and validated"
        );
        Ok(Self {
            types,
            operators,
            symbols,
            functions: options.funcs,
            rules_mode: options.rules_mode,
            decisions_mode: options.decisions_mode,
            frozen: false,
        })
    }

    pub fn from_config(source: &str, config: &EngineConfig) -> Result<Self, Error> {
        Self::new(source, EngineOptions::from_config(config))
    }

    fn ensure_mutable(&self) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::EngineFrozen);
        }
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Register a host function. Fails after freeze.
    pub fn add_function(&mut self, name: impl Into<String>, func: HostFn) -> Result<(), Error> {
        self.ensure_mutable()?;
        self.functions.insert(name.into(), func);
        Ok(())
    }

    /// Register an alias type. An existing name is overwritten, so
    /// built-in validators can be replaced. Fails after freeze.
    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        base: BaseType,
        validator: TypeValidator,
    ) -> Result<(), Error> {
        self.ensure_mutable()?;
        self.types.register(name, base, validator);
        Ok(())
    }

    /// Register an operator definition. Fails after freeze, and on a
    /// conflicting token + operand-type tuple.
    pub fn register_operator(&mut self, def: OperatorDef) -> Result<(), Error> {
        self.ensure_mutable()?;
        self.operators.register(def)
    }

    /// Compile a rule set. Freezes the engine; compiling again later is
    /// allowed, registration is not.
    pub fn compile(
        &mut self,
        rules: &[RuleDef],
        match_config: Option<MatchConfig>,
    ) -> Result<CompiledRules, Error> {
        self.frozen = true;
        let ctx = ParseContext {
            symbols: &self.symbols,
            operators: &self.operators,
            types: &self.types,
            rules_mode: self.rules_mode,
        };
        let mut entries = Vec::with_capacity(rules.len());
        for def in rules {
            let ast = parse_rule(&def.rule, &ctx)?;
            let ast = optimizer::optimize(ast);
            let compiled = compile_rule(def.id.clone(), &ast)?;
            debug!(rule = %def.id, return_type = %compiled.return_type, "compiled rule");
            entries.push(CompiledEntry {
                compiled,
                metadata: def.meta.clone(),
            });
        }
        let validator = DecisionValidator::new(
            self.symbols.clone(),
            Arc::new(self.types.clone()),
            self.decisions_mode,
        );
        let matcher = Matcher::new(match_config.unwrap_or_default());
        Ok(CompiledRules::new(
            entries,
            validator,
            matcher,
            Arc::new(self.functions.clone()),
        ))
    }

    /// One-shot compile + evaluate for a single decision.
    pub fn eval(
        &mut self,
        rules: &[RuleDef],
        decision: &Decision,
        match_config: Option<MatchConfig>,
    ) -> Result<MatchResult, Error> {
        self.compile(rules, match_config)?.eval_single(decision)
    }

    /// Canonical schema text, reconstructable into an equal AST.
    pub fn export_schema(&self) -> String {
        self.symbols.export()
    }
}

/// Construct an engine from schema text, or from a schema file when
/// `source` names an existing file.
pub fn load_schema(source: &str, options: EngineOptions) -> Result<Engine, Error> {
    if Path::new(source).is_file() {
        let text = std::fs::read_to_string(source).map_err(|e| Error::SchemaParse {
            line: 0,
            message: format!("cannot read schema file '{source}': {e}"),
        })?;
        Engine::new(&text, options)
    } else {
        Engine::new(source, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OpToken;
    use serde_json::json;

    const SCHEMA: &str = "score: Int\nname: Str\nactive: Bool";

    fn decision(value: Value) -> Decision {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_compile_and_eval() {
        let mut engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        let compiled = engine
            .compile(&[RuleDef::new("r1", "score > 400")], None)
            .unwrap();
        let result = compiled.eval_single(&decision(json!({"score": 500}))).unwrap();
        assert_eq!(result.matched, vec![json!("r1")]);
    }

    #[test]
    fn test_one_shot_eval() {
        let mut engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        let result = engine
            .eval(
                &[RuleDef::new("r1", "score > 400")],
                &decision(json!({"score": 500})),
                None,
            )
            .unwrap();
        assert_eq!(result.matched, vec![json!("r1")]);
    }

    #[test]
    fn test_freeze_on_compile() {
        let mut engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        engine.compile(&[RuleDef::new("r1", "score > 0")], None).unwrap();
        assert!(engine.is_frozen());
        let err = engine
            .add_function("f", Arc::new(|_: &[Value]| Ok(json!(1))))
            .unwrap_err();
        assert!(matches!(err, Error::EngineFrozen));
        let err = engine
            .register_type("t", BaseType::Str, Arc::new(|_: &Value| true))
            .unwrap_err();
        assert!(matches!(err, Error::EngineFrozen));
    }

    #[test]
    fn test_freeze_on_eval() {
        let mut engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        engine
            .eval(
                &[RuleDef::new("r1", "score > 0")],
                &decision(json!({"score": 1})),
                None,
            )
            .unwrap();
        let err = engine
            .register_operator(OperatorDef::infix(
                OpToken::Keyword("near".to_string()),
                40,
                &["Int", "Int"],
                "Bool",
                Some(Arc::new(|_: &[Value]| Ok(json!(true)))),
            ))
            .unwrap_err();
        assert!(matches!(err, Error::EngineFrozen));
    }

    #[test]
    fn test_recompile_after_freeze_is_allowed() {
        let mut engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        engine.compile(&[RuleDef::new("r1", "score > 400")], None).unwrap();
        let compiled = engine.compile(&[RuleDef::new("r2", "score < 100")], None).unwrap();
        let result = compiled.eval_single(&decision(json!({"score": 50}))).unwrap();
        assert_eq!(result.matched, vec![json!("r2")]);
    }

    #[test]
    fn test_duplicate_operator_registration_conflicts() {
        let mut engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        let err = engine
            .register_operator(OperatorDef::infix(
                OpToken::Symbol("=".to_string()),
                40,
                &["*", "*"],
                "Bool",
                Some(Arc::new(|_: &[Value]| Ok(json!(true)))),
            ))
            .unwrap_err();
        assert!(matches!(err, Error::OperatorConflict { .. }));
    }

    #[test]
    fn test_custom_operator_on_minimal_preset() {
        let mut engine = Engine::new(
            SCHEMA,
            EngineOptions {
                operators: OperatorPreset::Minimal,
                ..Default::default()
            },
        )
        .unwrap();
        engine
            .register_operator(OperatorDef::infix(
                OpToken::Keyword("above".to_string()),
                40,
                &["Int", "Int"],
                "Bool",
                Some(Arc::new(|args: &[Value]| {
                    Ok(json!(crate::value::compare(&args[0], &args[1])
                        .is_some_and(|o| o.is_gt())))
                })),
            ))
            .unwrap();
        let result = engine
            .eval(
                &[RuleDef::new("r1", "score above 400")],
                &decision(json!({"score": 500})),
                None,
            )
            .unwrap();
        assert_eq!(result.matched, vec![json!("r1")]);
    }

    #[test]
    fn test_custom_type_overrides_builtin() {
        let mut engine = Engine::new("ip: ipv4", EngineOptions::default()).unwrap();
        engine
            .register_type("ipv4", BaseType::Str, Arc::new(|v: &Value| v.as_str() == Some("x")))
            .unwrap();
        let result = engine
            .eval(
                &[RuleDef::new("r1", "ip = '1.2.3.4'")],
                &decision(json!({"ip": "1.2.3.4"})),
                None,
            )
            .unwrap();
        // The overridden validator rejects the value, so loose-mode
        // validation drops the field and the rule sees nothing.
        assert!(result.matched.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_host_function_through_eval() {
        let mut engine = Engine::new(
            "amount: Int\ndiscount: (amount: Int) -> Float",
            EngineOptions::default(),
        )
        .unwrap();
        engine
            .add_function(
                "discount",
                Arc::new(|args: &[Value]| {
                    let n = args[0].as_i64().unwrap_or(0) as f64;
                    Ok(json!(n * 0.1))
                }),
            )
            .unwrap();
        let result = engine
            .eval(
                &[RuleDef::new("r1", "discount(amount) > 5.0")],
                &decision(json!({"amount": 100})),
                None,
            )
            .unwrap();
        assert_eq!(result.matched, vec![json!("r1")]);
    }

    #[test]
    fn test_rule_parse_error_propagates() {
        let mut engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        let err = engine
            .compile(&[RuleDef::new("r1", "unknown_field > 0")], None)
            .unwrap_err();
        assert!(matches!(err, Error::RuleParse { .. }));
    }

    #[test]
    fn test_export_schema_round_trips() {
        let engine = Engine::new(SCHEMA, EngineOptions::default()).unwrap();
        let exported = engine.export_schema();
        let reparsed = Engine::new(&exported, EngineOptions::default()).unwrap();
        assert_eq!(reparsed.export_schema(), exported);
    }

    #[test]
    fn test_rule_def_deserializes_with_flattened_metadata() {
        let def: RuleDef =
            serde_json::from_value(json!({"id": 1, "rule": "score > 0", "ordering": 3})).unwrap();
        assert_eq!(def.id, json!(1));
        assert_eq!(def.meta["ordering"], json!(3));
    }
}
