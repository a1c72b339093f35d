//! Schema validation
//!
//! Rejects schemas the rest of the engine cannot reason about:
//! duplicate names across the field/struct/function namespaces, unknown
//! type references, duplicate fields within a struct, and circular
//! struct definitions.

use std::collections::{HashMap, HashSet};

use crate::errors::Error;
use crate::schema::ast::{FieldDefinition, SchemaAst, SchemaType, StructDefinition};

pub struct SchemaValidator<'a> {
    ast: &'a SchemaAst,
    known_aliases: &'a HashSet<String>,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(ast: &'a SchemaAst, known_aliases: &'a HashSet<String>) -> Self {
        Self { ast, known_aliases }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let struct_names: HashSet<&str> = self.ast.structs.iter().map(|s| s.name.as_str()).collect();
        let known = |name: &str| {
            matches!(name, "Int" | "Float" | "Str" | "Bool" | "List")
                || struct_names.contains(name)
                || self.known_aliases.contains(name)
        };

        self.check_unique_top_level_names()?;

        for field in &self.ast.fields {
            self.check_field_types(field, None, &known)?;
        }
        for st in &self.ast.structs {
            let mut seen: HashSet<&str> = HashSet::new();
            for field in &st.fields {
                if !seen.insert(&field.name) {
                    return Err(Error::schema_validation(format!(
                        "duplicate field '{}' in struct '{}'",
                        field.name, st.name
                    )));
                }
                self.check_field_types(field, Some(&st.name), &known)?;
            }
        }
        for func in &self.ast.functions {
            for param in &func.parameters {
                self.check_type_ref(&param.type_name, &known, || {
                    format!("parameter '{}' of function '{}'", param.name, func.name)
                })?;
            }
            self.check_type_ref(&func.return_type_name, &known, || {
                format!("return type of function '{}'", func.name)
            })?;
        }

        self.check_circular_structs(&struct_names)
    }

    /// Top-level identifiers must be unique across the union of the
    /// field, struct, and function namespaces.
    fn check_unique_top_level_names(&self) -> Result<(), Error> {
        let mut seen: HashSet<&str> = HashSet::new();
        let names = self
            .ast
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.ast.structs.iter().map(|s| s.name.as_str()))
            .chain(self.ast.functions.iter().map(|f| f.name.as_str()));
        for name in names {
            if !seen.insert(name) {
                return Err(Error::schema_validation(format!("duplicate name: '{name}'")));
            }
        }
        Ok(())
    }

    fn check_field_types(
        &self,
        field: &FieldDefinition,
        in_struct: Option<&str>,
        known: &impl Fn(&str) -> bool,
    ) -> Result<(), Error> {
        let location = || match in_struct {
            Some(st) => format!("field '{}' in struct '{st}'", field.name),
            None => format!("field '{}'", field.name),
        };
        match field.schema_type {
            SchemaType::Custom => self.check_type_ref(&field.type_name, known, &location),
            SchemaType::List => {
                for element in &field.element_types {
                    self.check_type_ref(element, known, &location)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_type_ref(
        &self,
        type_name: &str,
        known: &impl Fn(&str) -> bool,
        location: impl Fn() -> String,
    ) -> Result<(), Error> {
        if known(type_name) {
            Ok(())
        } else {
            Err(Error::schema_validation(format!(
                "unknown type '{type_name}' in {}",
                location()
            )))
        }
    }

    /// DFS over the struct-field-type reference graph.
    fn check_circular_structs(&self, struct_names: &HashSet<&str>) -> Result<(), Error> {
        let struct_map: HashMap<&str, &StructDefinition> = self
            .ast
            .structs
            .iter()
            .map(|s| (s.name.as_str(), s))
            .collect();

        fn dfs<'s>(
            name: &'s str,
            struct_map: &HashMap<&'s str, &'s StructDefinition>,
            struct_names: &HashSet<&str>,
            visiting: &mut Vec<&'s str>,
        ) -> Result<(), Error> {
            if visiting.contains(&name) {
                return Err(Error::schema_validation(format!(
                    "circular struct reference involving '{name}'"
                )));
            }
            let Some(st) = struct_map.get(name) else {
                return Ok(());
            };
            visiting.push(name);
            for field in &st.fields {
                if field.schema_type == SchemaType::Custom
                    && struct_names.contains(field.type_name.as_str())
                {
                    dfs(&field.type_name, struct_map, struct_names, visiting)?;
                }
            }
            visiting.pop();
            Ok(())
        }

        for name in struct_names {
            dfs(name, &struct_map, struct_names, &mut Vec::new())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::parse_schema;

    fn validate(source: &str) -> Result<(), Error> {
        validate_with_aliases(source, &[])
    }

    fn validate_with_aliases(source: &str, aliases: &[&str]) -> Result<(), Error> {
        let ast = parse_schema(source).unwrap();
        let aliases: HashSet<String> = aliases.iter().map(|s| s.to_string()).collect();
        SchemaValidator::new(&ast, &aliases).validate()
    }

    #[test]
    fn test_valid_schema() {
        validate("struct A {x: Int}\na: A\nb: Str\nf: (n: Int) -> Bool").unwrap();
    }

    #[test]
    fn test_duplicate_across_namespaces() {
        let err = validate("a: Int\nstruct a {x: Int}").unwrap_err();
        assert!(err.to_string().contains("duplicate name"));
    }

    #[test]
    fn test_duplicate_field_in_struct() {
        let err = validate("struct A {x: Int, x: Str}").unwrap_err();
        assert!(err.to_string().contains("duplicate field"));
    }

    #[test]
    fn test_unknown_type() {
        let err = validate("a: Widget").unwrap_err();
        assert!(err.to_string().contains("unknown type 'Widget'"));
    }

    #[test]
    fn test_known_alias_accepted() {
        assert!(validate("ip: ipv4").is_err());
        validate_with_aliases("ip: ipv4", &["ipv4"]).unwrap();
    }

    #[test]
    fn test_unknown_list_element_type() {
        let err = validate("xs: List[Widget]").unwrap_err();
        assert!(err.to_string().contains("unknown type 'Widget'"));
    }

    #[test]
    fn test_unknown_function_types() {
        assert!(validate("f: (n: Widget) -> Bool").is_err());
        assert!(validate("f: (n: Int) -> Widget").is_err());
    }

    #[test]
    fn test_self_referential_struct() {
        let err = validate("struct Node {next: Node}").unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn test_mutual_struct_cycle() {
        let err = validate("struct A {b: B}\nstruct B {a: A}").unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        validate("struct Leaf {v: Int}\nstruct A {l: Leaf}\nstruct B {l: Leaf}\nstruct Top {a: A, b: B}")
            .unwrap();
    }
}
