//! Error types for context assembly

use claimline_domain::{ClaimId, ServiceError};
use claimline_intake::IdentityError;
use thiserror::Error;

/// Errors that can occur while assembling a context bundle
#[derive(Error, Debug)]
pub enum ContextError {
    /// No extracts exist for the claim yet
    #[error("No extracts found under '{0}'")]
    NotReady(String),

    /// The extracts name an external id that maps to a different claim
    #[error("Split-brain: processing {claim_id} but '{external_id}' maps to {canonical}")]
    SplitBrain {
        /// Claim being assembled
        claim_id: ClaimId,
        /// External id found on the extracts
        external_id: String,
        /// Canonical claim for that external id
        canonical: ClaimId,
    },

    /// Identity lookup failed
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// A collaborator failed
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// A bundle could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ContextError {
    fn from(err: serde_json::Error) -> Self {
        ContextError::Serialization(err.to_string())
    }
}

impl ContextError {
    /// Whether the operation can be retried
    ///
    /// Missing extracts may still be on their way; identity corruption never
    /// heals by itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            ContextError::NotReady(_) => true,
            ContextError::Identity(e) => e.is_retryable(),
            ContextError::Service(e) => e.is_transient(),
            ContextError::SplitBrain { .. } | ContextError::Serialization(_) => false,
        }
    }

    /// Whether the error means claim identity is corrupt
    pub fn is_identity_corruption(&self) -> bool {
        matches!(
            self,
            ContextError::SplitBrain { .. }
                | ContextError::Identity(IdentityError::CorruptMapping { .. })
        )
    }
}
