//! Runtime options
//!
//! Loaded from TOML:
//!
//! ```toml
//! builtins = true
//! strict_attributes = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Register the built-in `inheritable:1` class at startup
    pub builtins: bool,

    /// Reject definition attributes that no extension stores, instead of
    /// dropping them
    pub strict_attributes: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            builtins: true,
            strict_attributes: false,
        }
    }
}

impl RuntimeOptions {
    /// Parse options from TOML
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Builder: toggle the built-in classes
    pub fn with_builtins(mut self, builtins: bool) -> Self {
        self.builtins = builtins;
        self
    }

    /// Builder: toggle strict attribute checking
    pub fn with_strict_attributes(mut self, strict: bool) -> Self {
        self.strict_attributes = strict;
        self
    }
}
