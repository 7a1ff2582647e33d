//! Fetch error types.

use thiserror::Error;

/// Error type for usage fetches.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No credential was supplied.
    #[error("token is empty")]
    EmptyToken,

    /// The credential cannot be sent as a header value.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The endpoint rejected the credential (HTTP 401/403).
    #[error("openrouter unauthorized")]
    Unauthorized,

    /// Any other non-2xx response.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Trimmed response body.
        body: String,
    },

    /// HTTP transport failed (connect, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response is JSON but carries no usable usage figures.
    #[error("{0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Returns true if the endpoint rejected the credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Unauthorized)
    }

    /// Returns true for failures that may clear up on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) => true,
            FetchError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
