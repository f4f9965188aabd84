//! Error types for the decision agents

use claimline_domain::ServiceError;
use thiserror::Error;

/// Errors that can occur while invoking an agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// No template exists for the agent and version
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    /// The completion held no usable JSON object
    #[error("Parse error: {0}")]
    Parse(String),

    /// The JSON object broke the result schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// The model provider failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model call took too long
    #[error("LLM call timed out")]
    Timeout,

    /// A store failed
    #[error("Store error: {0}")]
    Store(#[from] ServiceError),

    /// A record could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Serialization(e.to_string())
    }
}

impl AgentError {
    /// Whether the whole step can be retried later
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Llm(_) | AgentError::Timeout => true,
            AgentError::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether the error came from the model's output rather than the call
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, AgentError::Parse(_) | AgentError::Validation(_))
    }
}
