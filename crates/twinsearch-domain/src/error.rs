//! Domain error types for mapping and enforcement.

use thiserror::Error;

/// Domain-specific errors for metadata, pointers and enforcers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum DomainError {
    /// Metadata violates its invariants.
    #[error("invalid metadata: {message}")]
    InvalidMetadata { message: String },

    /// A JSON pointer string is malformed.
    #[error("invalid json pointer: {value}")]
    InvalidPointer { value: String },

    /// An access control list cannot be interpreted.
    #[error("invalid access control list: {message}")]
    InvalidAcl { message: String },

    /// A policy document cannot be interpreted.
    #[error("invalid policy: {message}")]
    InvalidPolicy { message: String },

    /// The enforcer has no answer for the pointer.
    #[error("cannot resolve grantees for {pointer}")]
    UnresolvablePointer { pointer: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failure to turn a twin into a write model.
///
/// Mapping failures are deterministic: the same input always fails the same
/// way, so they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum MappingError {
    /// The twin payload is not valid JSON.
    #[error("twin is not valid json: {message}")]
    InvalidJson { message: String },

    /// The twin payload is valid JSON but not an object.
    #[error("twin must be a json object")]
    NotAnObject,

    /// A required top-level field is absent.
    #[error("twin is missing required field '{field}'")]
    MissingField { field: String },

    /// A top-level field has the wrong shape.
    #[error("twin field '{field}' is invalid: {message}")]
    InvalidField { field: String, message: String },

    /// Nesting exceeded the traversal limit.
    #[error("nesting deeper than {max_depth} at {pointer}")]
    DepthLimitExceeded { max_depth: usize, pointer: String },

    /// Metadata, ACL or policy rejected, or a pointer without grantees.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;
