//! Rule AST optimizer
//!
//! Bottom-up constant folding plus boolean identities. Folding only
//! rewrites what cannot change observable verdicts: operator
//! implementations are pure, and any operand removed by an identity
//! could only have contributed a falsy verdict through the evaluation
//! downgrade rule.

use serde_json::Value;

use crate::rules::ast::{RuleAst, RuleNode};
use crate::value::truthy;

pub fn optimize(ast: RuleAst) -> RuleAst {
    let root = optimize_node(ast.root);
    RuleAst {
        root,
        return_type: ast.return_type,
    }
}

fn bool_literal(node: &RuleNode) -> Option<bool> {
    match node {
        RuleNode::Literal {
            value: Value::Bool(b),
            ..
        } => Some(*b),
        _ => None,
    }
}

fn bool_node(b: bool) -> RuleNode {
    RuleNode::Literal {
        value: Value::Bool(b),
        type_name: "Bool".to_string(),
    }
}

fn optimize_node(node: RuleNode) -> RuleNode {
    match node {
        RuleNode::BinaryOp {
            token,
            left,
            right,
            type_name,
            func,
        } => {
            let left = optimize_node(*left);
            let right = optimize_node(*right);

            if let (
                RuleNode::Literal { value: lv, .. },
                RuleNode::Literal { value: rv, .. },
            ) = (&left, &right)
            {
                match token.as_str() {
                    "and" => return bool_node(truthy(lv) && truthy(rv)),
                    "or" => return bool_node(truthy(lv) || truthy(rv)),
                    _ => {
                        // Fold through the operator's own implementation;
                        // skip folding if it errors (kept for runtime,
                        // where it downgrades to false).
                        if let Some(f) = &func
                            && let Ok(value) = f(&[lv.clone(), rv.clone()])
                        {
                            return RuleNode::Literal { value, type_name };
                        }
                    }
                }
            }

            if token == "and" {
                match bool_literal(&left) {
                    Some(true) => return right,
                    Some(false) => return bool_node(false),
                    None => {}
                }
                match bool_literal(&right) {
                    Some(true) => return left,
                    Some(false) => return bool_node(false),
                    None => {}
                }
            } else if token == "or" {
                match bool_literal(&left) {
                    Some(true) => return bool_node(true),
                    Some(false) => return right,
                    None => {}
                }
                match bool_literal(&right) {
                    Some(true) => return bool_node(true),
                    Some(false) => return left,
                    None => {}
                }
            }

            RuleNode::BinaryOp {
                token,
                left: Box::new(left),
                right: Box::new(right),
                type_name,
                func,
            }
        }
        RuleNode::UnaryOp {
            token,
            operand,
            type_name,
            func,
        } => {
            let operand = optimize_node(*operand);

            if let RuleNode::Literal { value, .. } = &operand
                && let Ok(folded) = func(&[value.clone()])
            {
                return RuleNode::Literal {
                    value: folded,
                    type_name,
                };
            }
            // Double negation: not not x == x.
            if token == "not"
                && matches!(&operand, RuleNode::UnaryOp { token: inner, .. } if inner == "not")
            {
                if let RuleNode::UnaryOp { operand: inner, .. } = operand {
                    return *inner;
                }
                unreachable!();
            }

            RuleNode::UnaryOp {
                token,
                operand: Box::new(operand),
                type_name,
                func,
            }
        }
        RuleNode::FunctionCall {
            name,
            args,
            type_name,
        } => RuleNode::FunctionCall {
            name,
            args: args.into_iter().map(optimize_node).collect(),
            type_name,
        },
        leaf => leaf,
    }
}
