//! Domain error types

use thiserror::Error;

/// Domain-level errors raised while validating or decoding session data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A persisted snapshot could not be decoded.
    #[error("invalid session snapshot: {0}")]
    InvalidSnapshot(String),

    /// A persisted snapshot is missing one of its required parts.
    #[error("incomplete session snapshot: {0}")]
    IncompleteSnapshot(String),

    /// A configuration value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A response body did not have the expected shape.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
