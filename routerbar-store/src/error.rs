//! Store error types.

use thiserror::Error;

/// Errors that can occur in the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache record written by an incompatible build.
    #[error("Unsupported cache schema: {0}")]
    UnsupportedSchema(String),
}

impl StoreError {
    /// Returns true if the file exists but its contents could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            StoreError::Serialization(_) | StoreError::UnsupportedSchema(_)
        )
    }
}
