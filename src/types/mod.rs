//! Type registry and built-in alias types
//!
//! Custom types are named aliases over one of the four primitive base
//! kinds, each with a pure validator predicate. The registry seeds a
//! handful of built-in string aliases (ipv4, email, uuid, ...) and
//! accepts host registrations until the engine freezes.

pub mod builtin;
pub mod registry;

pub use builtin::register_builtin_types;
pub use registry::{TypeDefinition, TypeRegistry, TypeValidator};

use serde_json::Value;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The four primitive base kinds an alias type may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
pub enum BaseType {
    Int,
    Float,
    Str,
    Bool,
}

impl BaseType {
    /// Whether a runtime value matches this base kind. Booleans are
    /// never numbers, and `Float` accepts integral values.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            BaseType::Int => value.as_i64().is_some() || value.as_u64().is_some(),
            BaseType::Float => value.is_number(),
            BaseType::Str => value.is_string(),
            BaseType::Bool => value.is_boolean(),
        }
    }
}
