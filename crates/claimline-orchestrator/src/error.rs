//! Error types for pipeline runs

use crate::state::RunState;
use claimline_agents::AgentError;
use claimline_context::ContextError;
use claimline_domain::{ClaimId, ServiceError};
use claimline_gatekeeper::GatekeeperError;
use claimline_intake::IntakeError;
use thiserror::Error;

/// Errors that can occur while running the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Extraction or intake failed
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    /// Context assembly failed
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// The decision agents failed
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Finalization failed
    #[error("Gatekeeper error: {0}")]
    Gatekeeper(#[from] GatekeeperError),

    /// A collaborator failed
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// There is no record for the claim
    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    /// The runner tried to skip or repeat a step
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: RunState,
        /// Requested state
        to: RunState,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (channel or task failures)
    #[error("Worker error: {0}")]
    Worker(String),

    /// A record could not be decoded or encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl PipelineError {
    /// Whether the failed step may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Intake(e) => e.is_retryable(),
            PipelineError::Context(e) => e.is_retryable(),
            PipelineError::Agent(e) => e.is_retryable(),
            PipelineError::Gatekeeper(e) => e.is_retryable(),
            PipelineError::Service(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether the error means claim identity is corrupt
    pub fn is_identity_corruption(&self) -> bool {
        match self {
            PipelineError::Intake(e) => e.is_identity_corruption(),
            PipelineError::Context(e) => e.is_identity_corruption(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_intake::IdentityError;

    #[test]
    fn test_retry_classification() {
        assert!(PipelineError::from(ServiceError::Unavailable("down".into())).is_retryable());
        assert!(PipelineError::from(ContextError::NotReady("x/extracts/".into())).is_retryable());
        assert!(PipelineError::from(AgentError::Timeout).is_retryable());
        assert!(!PipelineError::from(AgentError::PromptNotFound("fraud_agent".into())).is_retryable());
        assert!(!PipelineError::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_identity_corruption_is_fatal() {
        let corrupt = IdentityError::CorruptMapping {
            external_id: "CLM-1".into(),
            detail: "missing claim_id".into(),
        };
        let err = PipelineError::from(ContextError::from(corrupt));
        assert!(err.is_identity_corruption());
        assert!(!err.is_retryable());

        let split = PipelineError::from(ContextError::SplitBrain {
            claim_id: ClaimId::new(),
            external_id: "CLM-1".into(),
            canonical: ClaimId::new(),
        });
        assert!(split.is_identity_corruption());
        assert!(!split.is_retryable());
    }
}
