//! Error types for the storage layer

use claimline_domain::ServiceError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Key is not acceptable for this store
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A previous holder of the store lock panicked
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(rusqlite::Error::SqliteFailure(code, msg))
                if matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                ServiceError::Throttled(msg.unwrap_or_else(|| code.to_string()))
            }
            StoreError::Database(err) => ServiceError::Unavailable(err.to_string()),
            StoreError::Io(err) if err.kind() == std::io::ErrorKind::NotFound => {
                ServiceError::NotFound(err.to_string())
            }
            StoreError::Io(err) => ServiceError::Unavailable(err.to_string()),
            StoreError::NotFound(key) => ServiceError::NotFound(key),
            StoreError::InvalidData(msg) => ServiceError::Corrupt(msg),
            StoreError::InvalidKey(key) => ServiceError::Rejected(key),
            StoreError::LockPoisoned => ServiceError::Unavailable("store lock poisoned".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_database_is_transient() {
        let err = StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        ));
        assert!(ServiceError::from(err).is_transient());
    }

    #[test]
    fn test_invalid_data_is_not_transient() {
        let err: ServiceError = StoreError::InvalidData("bad json".into()).into();
        assert!(matches!(err, ServiceError::Corrupt(_)));
        assert!(!err.is_transient());
    }
}
