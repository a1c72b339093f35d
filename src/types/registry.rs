//! Custom type registry

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::BaseType;

/// Validator predicate for an alias type. Must be pure.
pub type TypeValidator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A named scalar type aliased to one of the four primitive base kinds.
#[derive(Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub base: BaseType,
    validator: TypeValidator,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, base: BaseType, validator: TypeValidator) -> Self {
        Self {
            name: name.into(),
            base,
            validator,
        }
    }

    /// Base-kind check first, then the alias validator.
    pub fn validate(&self, value: &Value) -> bool {
        self.base.matches(value) && (self.validator)(value)
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("name", &self.name)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// Registry of alias types, keyed by name. Re-registering a name
/// overwrites the previous definition, so hosts can replace a built-in
/// validator with their own.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDefinition>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, base: BaseType, validator: TypeValidator) {
        let name = name.into();
        self.types
            .insert(name.clone(), TypeDefinition::new(name, base, validator));
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered alias names, sorted for deterministic reporting.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Validate a value against a registered alias. Unregistered names
    /// validate as true: the base-type layer has already run, and an
    /// unknown alias has no predicate to apply.
    pub fn validate_value(&self, name: &str, value: &Value) -> bool {
        match self.types.get(name) {
            Some(def) => def.validate(value),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_validate() {
        let mut registry = TypeRegistry::new();
        registry.register(
            "positive_int",
            BaseType::Int,
            Arc::new(|v: &Value| v.as_i64().is_some_and(|n| n > 0)),
        );

        assert!(registry.contains("positive_int"));
        assert!(registry.validate_value("positive_int", &json!(3)));
        assert!(!registry.validate_value("positive_int", &json!(-3)));
        // Base-kind check runs before the predicate.
        assert!(!registry.validate_value("positive_int", &json!("3")));
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut registry = TypeRegistry::new();
        registry.register("flag", BaseType::Bool, Arc::new(|_: &Value| true));
        registry.register("flag", BaseType::Bool, Arc::new(|_: &Value| false));
        assert!(!registry.validate_value("flag", &json!(true)));
    }

    #[test]
    fn test_unregistered_name_passes() {
        let registry = TypeRegistry::new();
        assert!(registry.validate_value("anything", &json!(1)));
    }
}
