//! Rule expression language
//!
//! Rules are boolean expressions over schema-bound identifiers. The
//! tokenizer and Pratt parser produce a typed AST; the optimizer folds
//! constants; the compiler lowers the AST to a closure tree.

pub mod ast;
pub mod compiler;
pub mod optimizer;
pub mod parser;
pub mod token;

pub use ast::{RuleAst, RuleNode};
pub use compiler::{CompiledRule, FunctionRegistry, HostFn, compile_rule};
pub use parser::{ParseContext, parse_rule};
