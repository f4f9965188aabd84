//! Errors reported by external collaborators

use thiserror::Error;

/// Failure reported by a collaborator (store, OCR, detector, bus, ...)
///
/// Collaborators map their own failures onto these variants so that the
/// pipeline can decide between retrying and routing to human review without
/// knowing which backend produced the error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The service could not be reached or failed internally
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The service asked the caller to slow down
    #[error("Throttled: {0}")]
    Throttled(String),

    /// The requested key or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service refused the request as invalid
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Stored data could not be decoded
    #[error("Corrupt data: {0}")]
    Corrupt(String),
}

impl ServiceError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Unavailable(_) | ServiceError::Throttled(_))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Corrupt(e.to_string())
    }
}
