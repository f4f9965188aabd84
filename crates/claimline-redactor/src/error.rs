//! Error types for the Redactor

use claimline_domain::ServiceError;
use thiserror::Error;

/// Errors that can occur during redaction
#[derive(Error, Debug)]
pub enum RedactionError {
    /// The entity detector failed; nothing was redacted
    #[error("Entity detection failed: {0}")]
    Detection(#[from] ServiceError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RedactionError {
    /// Whether the document can be submitted again
    ///
    /// Detector failures always are: the document was left untouched.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RedactionError::Detection(_))
    }
}
