//! # AppError
//!
//! Centralized error handling for the board.
//! Every port returns this type so adapters and services agree on what a
//! failure means for the caller.

use thiserror::Error;

/// The primary error type for all board operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A required field was empty or malformed. Nothing was written.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Resource not found (e.g., Thread)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Duplicate post number or attachment key.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database or object store unreachable, or a query failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Failures that are neither the caller's nor the storage's fault
    /// (rendering, misconfiguration).
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn thread_not_found(id: impl ToString) -> Self {
        Self::NotFound("thread".to_string(), id.to_string())
    }
}

/// A specialized Result type for board logic.
pub type Result<T> = std::result::Result<T, AppError>;
