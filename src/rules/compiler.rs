//! Rule compiler
//!
//! Lowers a typed AST to a tree of closures returning runtime values.
//! Evaluation is total at the rule boundary: every failure inside a
//! rule (missing field, missing function, operator error) downgrades
//! to a `false` verdict so one bad rule cannot abort a batch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::Error;
use crate::rules::ast::{RuleAst, RuleNode};
use crate::value::{Decision, truthy};

/// Host-provided function implementation.
pub type HostFn = Arc<dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync>;

/// Finalized name-to-implementation map available during evaluation.
pub type FunctionRegistry = HashMap<String, HostFn>;

type EvalFn = Box<dyn Fn(&Decision, &FunctionRegistry) -> Result<Value, Error> + Send + Sync>;

/// A rule lowered to an evaluator closure.
pub struct CompiledRule {
    pub rule_id: Value,
    pub return_type: String,
    /// Dotted paths the rule references, in first-use order.
    pub variables: Vec<String>,
    /// Function names the rule calls, in first-use order.
    pub functions: Vec<String>,
    eval: EvalFn,
}

impl CompiledRule {
    /// Evaluate against a cleaned decision record. Never fails: any
    /// evaluation error becomes a `false` verdict.
    pub fn evaluate(&self, decision: &Decision, functions: &FunctionRegistry) -> Value {
        (self.eval)(decision, functions).unwrap_or(Value::Bool(false))
    }
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("rule_id", &self.rule_id)
            .field("return_type", &self.return_type)
            .field("variables", &self.variables)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// Compile a typed AST into a [`CompiledRule`].
pub fn compile_rule(rule_id: Value, ast: &RuleAst) -> Result<CompiledRule, Error> {
    let eval = build(&ast.root)?;
    let mut variables = Vec::new();
    let mut functions = Vec::new();
    collect_refs(&ast.root, &mut variables, &mut functions);
    Ok(CompiledRule {
        rule_id,
        return_type: ast.return_type.clone(),
        variables,
        functions,
        eval,
    })
}

fn collect_refs(node: &RuleNode, variables: &mut Vec<String>, functions: &mut Vec<String>) {
    match node {
        RuleNode::Variable { path, .. } => {
            if !variables.contains(path) {
                variables.push(path.clone());
            }
        }
        RuleNode::FunctionCall { name, args, .. } => {
            if !functions.contains(name) {
                functions.push(name.clone());
            }
            for arg in args {
                collect_refs(arg, variables, functions);
            }
        }
        RuleNode::UnaryOp { operand, .. } => collect_refs(operand, variables, functions),
        RuleNode::BinaryOp { left, right, .. } => {
            collect_refs(left, variables, functions);
            collect_refs(right, variables, functions);
        }
        RuleNode::Literal { .. } => {}
    }
}

fn build(node: &RuleNode) -> Result<EvalFn, Error> {
    match node {
        RuleNode::Literal { value, .. } => {
            let value = value.clone();
            Ok(Box::new(move |_, _| Ok(value.clone())))
        }

        RuleNode::Variable { path, .. } => {
            if path.contains('.') {
                let parts: Vec<String> = path.split('.').map(str::to_string).collect();
                let path = path.clone();
                Ok(Box::new(move |data, _| {
                    let missing = || Error::rule_eval(format!("field '{path}' not found"));
                    let mut current = data.get(&parts[0]).ok_or_else(missing)?;
                    for part in &parts[1..] {
                        current = current
                            .as_object()
                            .and_then(|map| map.get(part))
                            .ok_or_else(missing)?;
                    }
                    Ok(current.clone())
                }))
            } else {
                let name = path.clone();
                Ok(Box::new(move |data, _| {
                    data.get(&name)
                        .cloned()
                        .ok_or_else(|| Error::rule_eval(format!("field '{name}' not found")))
                }))
            }
        }

        RuleNode::FunctionCall { name, args, .. } => {
            let arg_fns: Vec<EvalFn> = args.iter().map(build).collect::<Result<_, _>>()?;
            let name = name.clone();
            Ok(Box::new(move |data, functions| {
                let func = functions
                    .get(&name)
                    .ok_or_else(|| Error::rule_eval(format!("function '{name}' not found")))?;
                let mut evaluated = Vec::with_capacity(arg_fns.len());
                for arg in &arg_fns {
                    evaluated.push(arg(data, functions)?);
                }
                func(&evaluated)
            }))
        }

        RuleNode::UnaryOp { operand, func, .. } => {
            let operand = build(operand)?;
            let func = func.clone();
            Ok(Box::new(move |data, functions| {
                func(&[operand(data, functions)?])
            }))
        }

        RuleNode::BinaryOp {
            token,
            left,
            right,
            func,
            ..
        } => {
            let left = build(left)?;
            let right = build(right)?;
            match token.as_str() {
                // Short-circuit is observable, not an optimization: a
                // right operand whose evaluation would fail must not
                // change the result once the left side decides it.
                "and" => Ok(Box::new(move |data, functions| {
                    let lv = match left(data, functions) {
                        Ok(v) => truthy(&v),
                        Err(_) => return Ok(Value::Bool(false)),
                    };
                    if !lv {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(truthy(&right(data, functions)?)))
                })),
                // `or` recovers from a failing operand on either side.
                "or" => Ok(Box::new(move |data, functions| {
                    let lv = left(data, functions).map(|v| truthy(&v)).unwrap_or(false);
                    if lv {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(
                        right(data, functions).map(|v| truthy(&v)).unwrap_or(false),
                    ))
                })),
                _ => {
                    let func = func.clone().ok_or_else(|| Error::TypeMismatch {
                        expected: format!("an implementation for operator '{token}'"),
                        got: "none".to_string(),
                    })?;
                    Ok(Box::new(move |data, functions| {
                        let lv = left(data, functions)?;
                        let rv = right(data, functions)?;
                        func(&[lv, rv])
                    }))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::operators::{OperatorPreset, build_operator_registry};
    use crate::rules::parser::{ParseContext, parse_rule};
    use crate::schema::{SymbolTable, parse_schema};
    use crate::types::TypeRegistry;
    use serde_json::json;
    use std::collections::HashSet;

    fn compile(schema: &str, rule: &str) -> CompiledRule {
        let symbols = SymbolTable::build(parse_schema(schema).unwrap(), HashSet::new()).unwrap();
        let ops = build_operator_registry(&OperatorPreset::Standard).unwrap();
        let types = TypeRegistry::new();
        let ctx = ParseContext {
            symbols: &symbols,
            operators: &ops,
            types: &types,
            rules_mode: Mode::Strict,
        };
        let ast = parse_rule(rule, &ctx).unwrap();
        compile_rule(json!("test"), &ast).unwrap()
    }

    fn decision(value: Value) -> Decision {
        value.as_object().unwrap().clone()
    }

    fn run(schema: &str, rule: &str, data: Value) -> Value {
        compile(schema, rule).evaluate(&decision(data), &FunctionRegistry::new())
    }

    #[test]
    fn test_comparison_rule() {
        assert_eq!(run("amount: Int", "amount > 0", json!({"amount": 100})), json!(true));
        assert_eq!(run("amount: Int", "amount > 0", json!({"amount": 0})), json!(false));
    }

    #[test]
    fn test_missing_field_is_false_not_error() {
        assert_eq!(run("amount: Int", "amount > 0", json!({})), json!(false));
    }

    #[test]
    fn test_and_short_circuits_on_missing_left_field() {
        let result = run(
            "amount: Int\nstate: Str",
            "amount > 0 and state = 'CA'",
            json!({"amount": 0}),
        );
        assert_eq!(result, json!(false));
    }

    #[test]
    fn test_and_with_failing_right_operand() {
        let result = run(
            "amount: Int\nstate: Str",
            "amount > 0 and state = 'CA'",
            json!({"amount": 5}),
        );
        assert_eq!(result, json!(false));
    }

    #[test]
    fn test_or_recovers_from_failing_left_operand() {
        let result = run(
            "amount: Int\nstate: Str",
            "state = 'CA' or amount > 0",
            json!({"amount": 5}),
        );
        assert_eq!(result, json!(true));
    }

    #[test]
    fn test_dotted_variable_descends_nested_objects() {
        let schema = "struct Address {city: Str}\nhome: Address";
        assert_eq!(
            run(schema, "home.city = 'Oslo'", json!({"home": {"city": "Oslo"}})),
            json!(true)
        );
        assert_eq!(
            run(schema, "home.city = 'Oslo'", json!({"home": {}})),
            json!(false)
        );
        assert_eq!(run(schema, "home.city = 'Oslo'", json!({})), json!(false));
    }

    #[test]
    fn test_function_call() {
        let rule = compile("amount: Int\ndouble: (n: Int) -> Int", "double(amount) > 10");
        let mut functions = FunctionRegistry::new();
        functions.insert(
            "double".to_string(),
            Arc::new(|args: &[Value]| {
                let n = args[0].as_i64().unwrap_or(0);
                Ok(json!(n * 2))
            }),
        );
        assert_eq!(
            rule.evaluate(&decision(json!({"amount": 6})), &functions),
            json!(true)
        );
        assert_eq!(
            rule.evaluate(&decision(json!({"amount": 4})), &functions),
            json!(false)
        );
    }

    #[test]
    fn test_missing_function_is_false() {
        let rule = compile("amount: Int\ndouble: (n: Int) -> Int", "double(amount) > 10");
        assert_eq!(
            rule.evaluate(&decision(json!({"amount": 100})), &FunctionRegistry::new()),
            json!(false)
        );
    }

    #[test]
    fn test_host_function_error_is_false() {
        let rule = compile("amount: Int\ndouble: (n: Int) -> Int", "double(amount) > 10");
        let mut functions = FunctionRegistry::new();
        functions.insert(
            "double".to_string(),
            Arc::new(|_: &[Value]| Err(Error::rule_eval("boom"))),
        );
        assert_eq!(
            rule.evaluate(&decision(json!({"amount": 100})), &functions),
            json!(false)
        );
    }

    #[test]
    fn test_not_operator() {
        assert_eq!(run("active: Bool", "not active", json!({"active": false})), json!(true));
        assert_eq!(run("active: Bool", "not active", json!({"active": true})), json!(false));
    }

    #[test]
    fn test_membership() {
        assert_eq!(
            run("state: Str", "state in ['CA', 'NY']", json!({"state": "CA"})),
            json!(true)
        );
        assert_eq!(
            run("state: Str", "state not in ['CA', 'NY']", json!({"state": "TX"})),
            json!(true)
        );
    }

    #[test]
    fn test_referenced_variables_and_functions_collected() {
        let rule = compile(
            "amount: Int\nstate: Str\nrisk: (n: Int) -> Float",
            "risk(amount) > 0.5 and state = 'CA' and amount > 0",
        );
        assert_eq!(rule.variables, vec!["amount", "state"]);
        assert_eq!(rule.functions, vec!["risk"]);
    }

    #[test]
    fn test_numeric_rule_returns_number() {
        let rule = compile("weight: Float", "weight");
        assert_eq!(
            rule.evaluate(&decision(json!({"weight": 0.7})), &FunctionRegistry::new()),
            json!(0.7)
        );
    }
}
