//! Error types for intake and extraction

use claimline_domain::ServiceError;
use claimline_redactor::RedactionError;
use thiserror::Error;

/// Errors raised while resolving claim identity
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The key-value store failed
    #[error("Store error: {0}")]
    Store(#[from] ServiceError),

    /// A mapping exists but does not hold a usable claim id
    #[error("Corrupt identity mapping for '{external_id}': {detail}")]
    CorruptMapping {
        /// External claim number whose mapping is broken
        external_id: String,
        /// What is wrong with it
        detail: String,
    },
}

impl IdentityError {
    /// Whether the operation can be retried
    ///
    /// A corrupt mapping needs an operator; retrying cannot fix it.
    pub fn is_retryable(&self) -> bool {
        match self {
            IdentityError::Store(e) => e.is_transient(),
            IdentityError::CorruptMapping { .. } => false,
        }
    }
}

/// Errors that can occur during intake and document processing
#[derive(Error, Debug)]
pub enum IntakeError {
    /// Identity resolution failed
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// A collaborator failed
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Redaction failed; nothing was written
    #[error("Redaction error: {0}")]
    Redaction(#[from] RedactionError),

    /// Request is missing required data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A stored record could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        IntakeError::Serialization(err.to_string())
    }
}

impl IntakeError {
    /// Whether the operation can be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            IntakeError::Identity(e) => e.is_retryable(),
            IntakeError::Service(e) => e.is_transient(),
            IntakeError::Redaction(e) => e.is_retryable(),
            IntakeError::InvalidRequest(_)
            | IntakeError::Serialization(_)
            | IntakeError::Config(_) => false,
        }
    }

    /// Whether the error means identity data is corrupt
    pub fn is_identity_corruption(&self) -> bool {
        matches!(
            self,
            IntakeError::Identity(IdentityError::CorruptMapping { .. })
        )
    }
}
