//! Core error types for `RouterBar`.

use thiserror::Error;

/// Core error type for `RouterBar` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid data in a record or response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
