//! Typed rule AST
//!
//! A closed sum; every node carries its resolved type name. Operator
//! nodes capture the implementation chosen during type-dispatching
//! resolution, so the compiler never consults the registry again.

use std::fmt;

use serde_json::Value;

use crate::operators::OperatorFn;

#[derive(Clone)]
pub enum RuleNode {
    Literal {
        value: Value,
        type_name: String,
    },
    Variable {
        path: String,
        type_name: String,
    },
    FunctionCall {
        name: String,
        args: Vec<RuleNode>,
        type_name: String,
    },
    UnaryOp {
        token: String,
        operand: Box<RuleNode>,
        type_name: String,
        func: OperatorFn,
    },
    BinaryOp {
        token: String,
        left: Box<RuleNode>,
        right: Box<RuleNode>,
        type_name: String,
        /// `None` for `and`/`or`; the compiler hard-codes those.
        func: Option<OperatorFn>,
    },
}

impl RuleNode {
    pub fn type_name(&self) -> &str {
        match self {
            RuleNode::Literal { type_name, .. }
            | RuleNode::Variable { type_name, .. }
            | RuleNode::FunctionCall { type_name, .. }
            | RuleNode::UnaryOp { type_name, .. }
            | RuleNode::BinaryOp { type_name, .. } => type_name,
        }
    }
}

impl fmt::Debug for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleNode::Literal { value, type_name } => f
                .debug_struct("Literal")
                .field("value", value)
                .field("type_name", type_name)
                .finish(),
            RuleNode::Variable { path, type_name } => f
                .debug_struct("Variable")
                .field("path", path)
                .field("type_name", type_name)
                .finish(),
            RuleNode::FunctionCall {
                name,
                args,
                type_name,
            } => f
                .debug_struct("FunctionCall")
                .field("name", name)
                .field("args", args)
                .field("type_name", type_name)
                .finish(),
            RuleNode::UnaryOp {
                token,
                operand,
                type_name,
                ..
            } => f
                .debug_struct("UnaryOp")
                .field("token", token)
                .field("operand", operand)
                .field("type_name", type_name)
                .finish_non_exhaustive(),
            RuleNode::BinaryOp {
                token,
                left,
                right,
                type_name,
                ..
            } => f
                .debug_struct("BinaryOp")
                .field("token", token)
                .field("left", left)
                .field("right", right)
                .field("type_name", type_name)
                .finish_non_exhaustive(),
        }
    }
}

/// A fully parsed rule with its root node and resolved return type.
#[derive(Debug, Clone)]
pub struct RuleAst {
    pub root: RuleNode,
    pub return_type: String,
}
