//! Schema definition language
//!
//! A schema declares the typed fields a decision may carry, plus struct,
//! function, and alias definitions. The parser produces an AST, the
//! validator rejects inconsistent schemas, and the symbol table flattens
//! struct fields into dotted-path lookups for the rule parser.

pub mod ast;
pub mod parser;
pub mod symbols;
pub mod validator;

pub use ast::{FieldDefinition, FunctionDefinition, FunctionParameter, SchemaAst, SchemaType, StructDefinition};
pub use parser::parse_schema;
pub use symbols::SymbolTable;
