//! Engine configuration
//!
//! Reads TOML configuration for engine construction and match policy.
//! Defaults mirror the library defaults: strict rule compilation, loose
//! decision validation, the standard operator preset.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, IntoStaticStr};
use thiserror::Error;

use crate::operators::OperatorPreset;
use crate::runtime::matcher::MatchConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Strict or loose behavior. Rule compilation defaults to strict,
/// decision validation to loose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Strict,
    Loose,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default, rename = "match")]
    pub matching: MatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    /// Rule-compilation behavior: "strict" fails the compile on type
    /// and arity errors, "loose" defers them to runtime truthiness.
    #[serde(default = "default_rules_mode")]
    pub rules_mode: Mode,

    /// Decision-validation behavior: "strict" raises on the first bad
    /// field, "loose" drops bad fields and records warnings.
    #[serde(default = "default_decisions_mode")]
    pub decisions_mode: Mode,

    /// Operator preset: "standard", "minimal", or an explicit token list.
    #[serde(default)]
    pub operators: OperatorPreset,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            rules_mode: default_rules_mode(),
            decisions_mode: default_decisions_mode(),
            operators: OperatorPreset::default(),
        }
    }
}

fn default_rules_mode() -> Mode {
    Mode::Strict
}

fn default_decisions_mode() -> Mode {
    Mode::Loose
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = self.matching.threshold
            && !threshold.is_finite()
        {
            return Err(ConfigError::Validation(
                "match.threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}
