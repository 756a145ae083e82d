//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
///
/// Errors split into transient ones, which may succeed when retried, and
/// permanent ones, which will fail the same way every time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum StorageError {
    /// Connection to the store was lost or could not be established.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// The store did not answer in time.
    #[error("store operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The store is overloaded or temporarily refusing work.
    #[error("store temporarily unavailable: {message}")]
    Unavailable { message: String },

    /// The store rejected the document itself.
    #[error("invalid document {document_id}: {message}")]
    InvalidDocument {
        document_id: String,
        message: String,
    },

    /// A store-side constraint was violated.
    #[error("constraint violation on {document_id}: {message}")]
    ConstraintViolation {
        document_id: String,
        message: String,
    },

    /// The store refused our credentials.
    #[error("authentication to store failed: {message}")]
    AuthenticationFailed { message: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Serialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    /// True when retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::ConnectionError { .. }
                | StorageError::Timeout { .. }
                | StorageError::Unavailable { .. }
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::Timeout { duration_ms: 10 }.is_transient());
        assert!(StorageError::ConnectionError {
            message: "reset".to_string()
        }
        .is_transient());
        assert!(StorageError::Unavailable {
            message: "busy".to_string()
        }
        .is_transient());

        assert!(!StorageError::InvalidDocument {
            document_id: "t".to_string(),
            message: "too large".to_string()
        }
        .is_transient());
        assert!(!StorageError::AuthenticationFailed {
            message: "bad credentials".to_string()
        }
        .is_transient());
        assert!(!StorageError::ConstraintViolation {
            document_id: "t".to_string(),
            message: "duplicate key".to_string()
        }
        .is_transient());
    }
}
