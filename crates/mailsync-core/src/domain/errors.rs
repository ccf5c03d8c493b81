//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and malformed stored values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// A stored sync-interval value that is neither a sentinel nor a
    /// non-negative minute count
    #[error("Invalid sync interval value: {0}")]
    InvalidInterval(i32),

    /// Registry type tag is empty or malformed
    #[error("Invalid registry type tag: {0}")]
    InvalidTypeTag(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
