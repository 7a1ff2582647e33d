//! The fetch capability consumed by the refresher.

use async_trait::async_trait;
use routerbar_core::Usage;

use crate::error::FetchError;

/// Fetches usage figures for a credential.
///
/// The refresher only ever talks to this trait; tests substitute an
/// in-memory implementation. Cancellation happens by dropping the future,
/// so implementations must not leave shared state half-updated across an
/// await point.
///
/// ## Implementing a Fetcher
///
/// ```ignore
/// struct Fixed(Usage);
///
/// #[async_trait]
/// impl UsageFetcher for Fixed {
///     async fn fetch_usage(&self, _token: &str) -> Result<Usage, FetchError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait UsageFetcher: Send + Sync {
    /// Fetches the current usage for `token`.
    async fn fetch_usage(&self, token: &str) -> Result<Usage, FetchError>;
}
