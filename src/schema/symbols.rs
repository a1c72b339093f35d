//! Symbol table and canonical export
//!
//! The symbol table maps dotted field paths (`person.address.city`) to
//! their definitions by transitively expanding struct-typed fields.
//! List and alias fields are leaves. It also reconstructs canonical
//! schema text that parses back into an equal AST.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use serde_json::Value;

use crate::errors::Error;
use crate::schema::ast::{FieldDefinition, FunctionDefinition, SchemaAst, StructDefinition};
use crate::schema::validator::SchemaValidator;

#[derive(Debug, Clone)]
pub struct SymbolTable {
    ast: SchemaAst,
    fields: HashMap<String, FieldDefinition>,
    known_aliases: HashSet<String>,
}

impl SymbolTable {
    /// Validate the AST and build the dotted-path index.
    pub fn build(ast: SchemaAst, known_aliases: HashSet<String>) -> Result<Self, Error> {
        SchemaValidator::new(&ast, &known_aliases).validate()?;
        let mut table = Self {
            ast,
            fields: HashMap::new(),
            known_aliases,
        };
        table.index();
        Ok(table)
    }

    fn index(&mut self) {
        let struct_map: HashMap<String, StructDefinition> = self
            .ast
            .structs
            .iter()
            .map(|s| (s.name.clone(), s.clone()))
            .collect();
        for field in self.ast.fields.clone() {
            let type_name = field.type_name.clone();
            let prefix = field.name.clone();
            self.fields.insert(prefix.clone(), field);
            if struct_map.contains_key(&type_name) {
                self.index_struct(&prefix, &type_name, &struct_map);
            }
        }
    }

    fn index_struct(
        &mut self,
        prefix: &str,
        struct_name: &str,
        struct_map: &HashMap<String, StructDefinition>,
    ) {
        let Some(st) = struct_map.get(struct_name) else {
            return;
        };
        for field in &st.fields {
            let path = format!("{prefix}.{}", field.name);
            self.fields.insert(path.clone(), field.clone());
            if struct_map.contains_key(&field.type_name) {
                self.index_struct(&path, &field.type_name, struct_map);
            }
        }
    }

    /// Resolve a dotted path to its field definition.
    pub fn field(&self, path: &str) -> Option<&FieldDefinition> {
        self.fields.get(path)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.ast.functions.iter().find(|f| f.name == name)
    }

    /// Top-level fields in declaration order, for decision validation.
    pub fn top_level_fields(&self) -> &[FieldDefinition] {
        &self.ast.fields
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.ast.structs.iter().any(|s| s.name == name)
    }

    /// Primitives, struct names, and registered alias names.
    pub fn known_type_names(&self) -> HashSet<String> {
        let mut names: HashSet<String> = ["Int", "Float", "Str", "Bool"]
            .into_iter()
            .map(str::to_string)
            .collect();
        names.extend(self.ast.structs.iter().map(|s| s.name.clone()));
        names.extend(self.known_aliases.iter().cloned());
        names
    }

    /// Canonical schema text: structs, then top-level fields, then
    /// functions, each in declaration order.
    pub fn export(&self) -> String {
        let mut out = String::new();
        for st in &self.ast.structs {
            let fields: Vec<String> = st.fields.iter().map(format_field).collect();
            let _ = writeln!(out, "struct {} {{{}}}", st.name, fields.join(", "));
        }
        for field in &self.ast.fields {
            let _ = writeln!(out, "{}", format_field(field));
        }
        for func in &self.ast.functions {
            let params: Vec<String> = func
                .parameters
                .iter()
                .map(|p| format!("{}: {}", p.name, p.type_name))
                .collect();
            let _ = writeln!(
                out,
                "{}: ({}) -> {}",
                func.name,
                params.join(", "),
                func.return_type_name
            );
        }
        out
    }
}

fn format_field(field: &FieldDefinition) -> String {
    let mut s = format!("{}: {}", field.name, field.type_name);
    if field.optional {
        s.push('?');
    }
    if !field.constraints.is_empty() {
        let pairs: Vec<String> = field
            .constraints
            .iter()
            .map(|(k, v)| format!("{k}: {}", format_literal(v)))
            .collect();
        let _ = write!(s, " {{{}}}", pairs.join(", "));
    }
    s
}

/// Render a constraint literal so it parses back to the same value.
fn format_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        Value::Number(n) if n.is_f64() => format!("{:?}", n.as_f64().unwrap()),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Null | Value::Object(_) => String::new(),
    }
}
