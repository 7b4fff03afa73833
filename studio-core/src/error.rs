//! Error types for editor operations.

use thiserror::Error;

/// Result type for editor operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in editor operations.
///
/// Commands that reference ids missing from the scene are not errors: they
/// are treated as benign races and ignored.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A command was rejected because its arguments are invalid.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
