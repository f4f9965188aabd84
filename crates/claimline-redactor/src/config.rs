//! Configuration for the Redactor

use serde::{Deserialize, Serialize};

/// Configuration for the Redactor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactorConfig {
    /// Largest chunk submitted to the detector (characters)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Score at or above which a detection counts as sensitive content
    #[serde(default = "default_phi_threshold")]
    pub phi_threshold: f64,

    /// Detections scoring below this are not redacted
    #[serde(default)]
    pub min_score: f64,
}

fn default_chunk_size() -> usize {
    18_000
}

fn default_chunk_overlap() -> usize {
    2_000
}

fn default_phi_threshold() -> f64 {
    0.90
}

impl Default for RedactorConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            phi_threshold: default_phi_threshold(),
            min_score: 0.0,
        }
    }
}

impl RedactorConfig {
    /// Aggressive preset: smaller chunks, lower screening threshold
    pub fn aggressive() -> Self {
        Self {
            chunk_size: 5_000,
            chunk_overlap: 1_000,
            phi_threshold: 0.75,
            min_score: 0.0,
        }
    }

    /// Lenient preset: only high-confidence detections count
    pub fn lenient() -> Self {
        Self {
            chunk_size: 18_000,
            chunk_overlap: 2_000,
            phi_threshold: 0.95,
            min_score: 0.5,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be smaller than chunk_size".to_string());
        }
        if !(0.0..=1.0).contains(&self.phi_threshold) {
            return Err("phi_threshold must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err("min_score must be between 0.0 and 1.0".to_string());
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
