//! Gatekeeper error types

use claimline_domain::{ClaimId, ServiceError};
use thiserror::Error;

/// Errors that can occur while closing out a claim
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// The decision has no terminal state; a configuration problem upstream
    #[error("Unmapped decision: '{0}'")]
    UnmappedDecision(String),

    /// There is no record for the claim
    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    /// A human review was rejected before anything was written
    #[error("Invalid review: {0}")]
    InvalidReview(String),

    /// A collaborator failed
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// A stored record could not be decoded or encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GatekeeperError {
    fn from(err: serde_json::Error) -> Self {
        GatekeeperError::Serialization(err.to_string())
    }
}

impl GatekeeperError {
    /// Whether the operation can be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            GatekeeperError::Service(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(GatekeeperError::Service(ServiceError::Throttled("slow".into())).is_retryable());
        assert!(!GatekeeperError::Service(ServiceError::Rejected("bad".into())).is_retryable());
        assert!(!GatekeeperError::UnmappedDecision("MAYBE".into()).is_retryable());
        assert!(!GatekeeperError::ClaimNotFound(ClaimId::new()).is_retryable());
    }
}
