//! Refresh error types.

use routerbar_fetch::FetchError;
use thiserror::Error;

/// Outcome of a refresh cycle that did not produce fresh usage.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// No credential is configured. Expected and retried on the next tick.
    #[error("token not configured")]
    NotConfigured,

    /// The fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The cycle was cancelled or hit its deadline before the fetch finished.
    #[error("refresh cancelled before completion")]
    Cancelled,
}

impl RefreshError {
    /// Returns true for the non-fatal missing-credential outcome.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, RefreshError::NotConfigured)
    }

    /// Returns true if the endpoint rejected the credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, RefreshError::Fetch(e) if e.is_auth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RefreshError::NotConfigured.is_not_configured());
        assert!(!RefreshError::Cancelled.is_not_configured());
        assert!(RefreshError::from(FetchError::Unauthorized).is_auth());
        assert!(!RefreshError::from(FetchError::EmptyToken).is_auth());
    }

    #[test]
    fn test_fetch_message_passes_through() {
        let err = RefreshError::from(FetchError::Unauthorized);
        assert_eq!(err.to_string(), "openrouter unauthorized");
    }
}
