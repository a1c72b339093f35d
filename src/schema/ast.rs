//! Schema AST
//!
//! Each variant carries only what the validator, symbol table, and
//! decision validator need. Constraint values reuse `serde_json::Value`
//! so schema literals and decision values share one representation.

use std::collections::BTreeMap;

use serde_json::Value;
use strum_macros::IntoStaticStr;

/// The kind tag on a field definition. `Custom` covers struct and alias
/// references alike; the validator resolves which one a name means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum SchemaType {
    Int,
    Float,
    Str,
    Bool,
    List,
    Custom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub schema_type: SchemaType,
    /// Declared type name: a primitive, a struct name, an alias name,
    /// or `List[T1|T2|...]`.
    pub type_name: String,
    /// Element type names for `List` fields; empty otherwise.
    pub element_types: Vec<String>,
    /// Ordered so canonical export is deterministic.
    pub constraints: BTreeMap<String, Value>,
    pub optional: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, schema_type: SchemaType, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_type,
            type_name: type_name.into(),
            element_types: vec![],
            constraints: BTreeMap::new(),
            optional: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameter {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<FunctionParameter>,
    pub return_type_name: String,
}

/// Top-level parse result: fields, structs, and function declarations
/// in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaAst {
    pub fields: Vec<FieldDefinition>,
    pub structs: Vec<StructDefinition>,
    pub functions: Vec<FunctionDefinition>,
}
