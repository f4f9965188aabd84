//! Configuration for the decision agents

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for agent invocation and the decision pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model calls per invocation before the fallback result is used
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fraud scores above this skip adjudication
    #[serde(default = "default_fraud_threshold")]
    pub fraud_threshold: f64,

    /// Parameter prefix under which prompt templates live
    #[serde(default = "default_prompt_prefix")]
    pub prompt_prefix: String,

    /// Template version to load (`latest` follows the version pointer)
    #[serde(default = "default_prompt_version")]
    pub prompt_version: String,

    /// Maximum time for a single model call (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Characters of unusable output kept in the masked log snippet
    #[serde(default = "default_snippet_len")]
    pub snippet_len: usize,

    /// Run the summarization agent before the fraud screen
    #[serde(default = "default_summarize")]
    pub summarize: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_fraud_threshold() -> f64 {
    0.70
}

fn default_prompt_prefix() -> String {
    "/claimline/prompts".to_string()
}

fn default_prompt_version() -> String {
    "latest".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_snippet_len() -> usize {
    200
}

fn default_summarize() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            fraud_threshold: default_fraud_threshold(),
            prompt_prefix: default_prompt_prefix(),
            prompt_version: default_prompt_version(),
            timeout_secs: default_timeout_secs(),
            snippet_len: default_snippet_len(),
            summarize: default_summarize(),
        }
    }
}

impl AgentConfig {
    /// Stricter screening: lower fraud threshold
    pub fn aggressive() -> Self {
        Self {
            fraud_threshold: 0.50,
            ..Self::default()
        }
    }

    /// Looser screening with a larger retry budget
    pub fn lenient() -> Self {
        Self {
            max_attempts: 5,
            fraud_threshold: 0.85,
            ..Self::default()
        }
    }

    /// Get the model call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.fraud_threshold) {
            return Err("fraud_threshold must be between 0.0 and 1.0".to_string());
        }
        if !self.prompt_prefix.starts_with('/') {
            return Err("prompt_prefix must start with '/'".to_string());
        }
        if self.prompt_version.trim().is_empty() {
            return Err("prompt_version must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.fraud_threshold, 0.70);
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(AgentConfig::aggressive().validate().is_ok());
        assert!(AgentConfig::lenient().validate().is_ok());
        assert!(AgentConfig::aggressive().fraud_threshold < AgentConfig::lenient().fraud_threshold);
    }

    #[test]
    fn test_invalid_threshold() {
        let config = AgentConfig {
            fraud_threshold: 1.5,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AgentConfig::lenient();
        let parsed = AgentConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
