//! Configuration for the pipeline runner and the worker binary
//!
//! [`PipelineConfig`] is the file format of the worker: one TOML document
//! with a section per crate, every section optional.

use crate::error::PipelineError;
use claimline_agents::AgentConfig;
use claimline_context::ContextConfig;
use claimline_intake::IntakeConfig;
use claimline_llm::OllamaConfig;
use claimline_redactor::RedactorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the pipeline runner
///
/// # Examples
///
/// ```
/// use claimline_orchestrator::OrchestratorConfig;
///
/// let config = OrchestratorConfig::default();
/// assert_eq!(config.max_step_attempts, 3);
/// assert_eq!(config.hitl_amount_threshold, 8000.0);
///
/// // Fewer automatic payouts
/// let config = OrchestratorConfig::aggressive();
/// assert_eq!(config.hitl_amount_threshold, 2500.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Attempts per step before the run fails
    /// Default: 3
    #[serde(default = "default_max_step_attempts")]
    pub max_step_attempts: u32,

    /// Backoff before the first retry of a step, doubled on each retry
    /// Default: 500 ms
    #[serde(default = "default_step_backoff_ms")]
    pub step_backoff_ms: u64,

    /// Approvals above this amount go to a human instead of being paid
    /// Default: 8000.0
    #[serde(default = "default_hitl_amount_threshold")]
    pub hitl_amount_threshold: f64,

    /// Pending run requests the worker queue holds
    /// Default: 64
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_step_attempts() -> u32 {
    3
}

fn default_step_backoff_ms() -> u64 {
    500
}

fn default_hitl_amount_threshold() -> f64 {
    8000.0
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_step_attempts: default_max_step_attempts(),
            step_backoff_ms: default_step_backoff_ms(),
            hitl_amount_threshold: default_hitl_amount_threshold(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl OrchestratorConfig {
    /// More human review, fewer retries
    pub fn aggressive() -> Self {
        Self {
            max_step_attempts: 2,
            hitl_amount_threshold: 2500.0,
            ..Self::default()
        }
    }

    /// More retries, higher auto-pay ceiling
    pub fn lenient() -> Self {
        Self {
            max_step_attempts: 5,
            step_backoff_ms: 1000,
            hitl_amount_threshold: 25_000.0,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn step_backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.step_backoff_ms.saturating_mul(factor))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_step_attempts == 0 {
            return Err("max_step_attempts must be greater than 0".to_string());
        }
        if !self.hitl_amount_threshold.is_finite() || self.hitl_amount_threshold < 0.0 {
            return Err("hitl_amount_threshold must be a non-negative amount".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".to_string());
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

/// Complete worker configuration
///
/// ```toml
/// [orchestrator]
/// hitl_amount_threshold = 8000.0
///
/// [agents]
/// fraud_threshold = 0.7
///
/// [ollama]
/// model = "llama3"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Redaction engine
    #[serde(default)]
    pub redactor: RedactorConfig,

    /// Intake and extraction
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Context assembly
    #[serde(default)]
    pub context: ContextConfig,

    /// Decision agents
    #[serde(default)]
    pub agents: AgentConfig,

    /// Runner and worker
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Model endpoint
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl PipelineConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&contents).map_err(PipelineError::Config)?;
        config.validate().map_err(PipelineError::Config)?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.redactor.validate().map_err(|e| format!("[redactor] {}", e))?;
        self.intake.validate().map_err(|e| format!("[intake] {}", e))?;
        self.context.validate().map_err(|e| format!("[context] {}", e))?;
        self.agents.validate().map_err(|e| format!("[agents] {}", e))?;
        self.orchestrator
            .validate()
            .map_err(|e| format!("[orchestrator] {}", e))?;
        if self.ollama.model.trim().is_empty() {
            return Err("[ollama] model must not be empty".to_string());
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
