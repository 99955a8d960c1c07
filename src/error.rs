//! Error types for ddbmem
//!
//! Provides a unified error type for all operations. Every variant maps onto
//! one exception name of the DynamoDB wire protocol (see [`DbError::code`]).

use thiserror::Error;

/// Result type alias using DbError
pub type Result<T> = std::result::Result<T, DbError>;

/// Unified error type for ddbmem operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbError {
    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    /// Malformed key or attribute, oversized item or key, key mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// An `Expected` precondition did not hold at commit time
    #[error("Conditional check failed: {0}")]
    ConditionalCheckFailed(String),

    // -------------------------------------------------------------------------
    // Resource Errors
    // -------------------------------------------------------------------------
    /// Lifecycle-altering call on a table that is not ACTIVE
    #[error("Resource in use: {0}")]
    ResourceInUse(String),

    /// Operation against an unknown table name
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Table-count ceiling or throughput-change governance violated
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine failure unrelated to the request (e.g. a thread could not start)
    #[error("Internal error: {0}")]
    Internal(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Exception name used on the wire for this error
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Validation(_) => "ValidationException",
            DbError::ConditionalCheckFailed(_) => "ConditionalCheckFailedException",
            DbError::ResourceInUse(_) => "ResourceInUseException",
            DbError::ResourceNotFound(_) => "ResourceNotFoundException",
            DbError::LimitExceeded(_) => "LimitExceededException",
            DbError::Config(_) | DbError::Internal(_) => "InternalServerError",
            DbError::Serialization(_) => "SerializationException",
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}
