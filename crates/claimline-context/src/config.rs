//! Configuration for the Context Assembler

use serde::{Deserialize, Serialize};

/// Configuration for the Context Assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Character budget of the optimized bundle's rendered documents
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,

    /// Documents needed before a bundle can be anything but INCOMPLETE
    #[serde(default = "default_min_documents")]
    pub min_documents: usize,
}

fn default_char_budget() -> usize {
    150_000
}

fn default_min_documents() -> usize {
    2
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            char_budget: default_char_budget(),
            min_documents: default_min_documents(),
        }
    }
}

impl ContextConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.char_budget == 0 {
            return Err("char_budget must be greater than 0".to_string());
        }
        if self.min_documents == 0 {
            return Err("min_documents must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
