//! The refresh cycle.
//!
//! One cycle reads the config, fetches usage, diffs it against the cached
//! snapshot, persists the new snapshot, updates the state store, fires the
//! notifier and finally the UI callback.

use chrono::Utc;
use routerbar_core::{Usage, UsageSnapshot, token_hash};
use routerbar_fetch::{FetchError, UsageFetcher};
use routerbar_store::{CacheStore, ConfigStore, StateStore};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RefreshError;
use crate::notifications::SpendNotifier;

/// Deadline applied to scheduled, startup and manual refreshes.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(20);

/// Zero-argument hook fired once at the end of every cycle.
pub type UpdateCallback = Arc<dyn Fn() + Send + Sync>;

/// Runs refresh cycles against shared stores.
///
/// Cycles are serialized: a call made while another is in flight waits for
/// it to finish and then runs its own full cycle.
pub struct Refresher {
    fetcher: Arc<dyn UsageFetcher>,
    config: Arc<ConfigStore>,
    state: Arc<StateStore>,
    cache: Option<Arc<CacheStore>>,
    notifier: Option<Arc<dyn SpendNotifier>>,
    on_update: RwLock<Option<UpdateCallback>>,
    in_flight: Mutex<()>,
}

impl Refresher {
    /// Creates a refresher without cache or notifier.
    pub fn new(
        fetcher: Arc<dyn UsageFetcher>,
        config: Arc<ConfigStore>,
        state: Arc<StateStore>,
    ) -> Self {
        Self {
            fetcher,
            config,
            state,
            cache: None,
            notifier: None,
            on_update: RwLock::new(None),
            in_flight: Mutex::new(()),
        }
    }

    /// Persists snapshots to `cache` and diffs against it.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Reports spend and errors to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn SpendNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the hook fired after every cycle.
    pub fn set_update_callback<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_update.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(f));
    }

    /// Runs one refresh cycle.
    ///
    /// The UI callback fires exactly once per call, whatever the outcome,
    /// including when the returned future is dropped before completion.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::NotConfigured` when no token is set,
    /// `RefreshError::Fetch` when the fetch fails and
    /// `RefreshError::Cancelled` when `cancel` fires first. Cache failures
    /// are logged and never returned.
    pub async fn refresh(&self, cancel: CancellationToken) -> Result<(), RefreshError> {
        let _notify = UpdateOnDrop(self);
        tokio::select! {
            guard = self.in_flight.lock() => {
                let result = self.run_cycle(&cancel).await;
                drop(guard);
                result
            }
            () = cancel.cancelled() => Err(RefreshError::Cancelled),
        }
    }

    /// Runs one refresh cycle bounded by `timeout`.
    ///
    /// On deadline the cycle's token is cancelled and the cycle is allowed
    /// to record the cancellation before returning.
    ///
    /// # Errors
    ///
    /// Same as [`Refresher::refresh`].
    pub async fn refresh_with_timeout(&self, timeout: Duration) -> Result<(), RefreshError> {
        let cancel = CancellationToken::new();
        let cycle = self.refresh(cancel.clone());
        tokio::pin!(cycle);

        tokio::select! {
            result = &mut cycle => result,
            () = tokio::time::sleep(timeout) => {
                warn!(timeout_secs = timeout.as_secs_f64(), "Refresh deadline exceeded");
                cancel.cancel();
                cycle.await
            }
        }
    }

    /// Validates `token` against the endpoint without touching cache or state.
    ///
    /// # Errors
    ///
    /// Returns the raw fetch error, or `RefreshError::Cancelled` when
    /// `cancel` fires first.
    pub async fn test_token(&self, cancel: CancellationToken, token: &str) -> Result<Usage, RefreshError> {
        tokio::select! {
            result = self.fetcher.fetch_usage(token) => Ok(result?),
            () = cancel.cancelled() => Err(RefreshError::Cancelled),
        }
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), RefreshError> {
        let config = self.config.get();
        let token = config.connection.token.trim();
        if token.is_empty() {
            info!("Refresh skipped: not configured");
            self.state.set_not_configured();
            return Err(RefreshError::NotConfigured);
        }
        self.state.clear_not_configured();

        info!("Refresh started");
        let fetched = tokio::select! {
            result = self.fetcher.fetch_usage(token) => result.and_then(check_usage).map_err(RefreshError::from),
            () = cancel.cancelled() => Err(RefreshError::Cancelled),
        };
        let usage = match fetched {
            Ok(usage) => usage,
            Err(e) => {
                error!(error = %e, "Refresh failed");
                self.state.set_error(&e);
                if let (Some(notifier), RefreshError::Fetch(_)) = (&self.notifier, &e) {
                    notifier.notify_error(&e.to_string());
                }
                return Err(e);
            }
        };

        let previous = self.load_previous().await;
        let hash = token_hash(token);
        let delta = compute_delta(previous.as_ref(), &hash, usage.total);
        if let Some(prev) = previous.as_ref().filter(|p| p.matches_key(&hash)) {
            if usage.total < prev.total_usage {
                warn!(
                    previous = prev.total_usage,
                    current = usage.total,
                    "Usage total decreased"
                );
            }
        }
        debug!(delta, "Usage delta computed");

        let now = Utc::now();
        if let Some(cache) = &self.cache {
            let snapshot = UsageSnapshot::from_usage(&usage, &hash, now);
            if let Err(e) = cache.save(&snapshot).await {
                warn!(error = %e, "Cache save failed");
            }
        }

        info!(total = usage.total, "Refresh succeeded");
        self.state.set_success(usage, now);

        if delta > 0.0 {
            if let Some(notifier) = &self.notifier {
                notifier.notify_update_spent(delta);
            }
        }
        Ok(())
    }

    async fn load_previous(&self) -> Option<UsageSnapshot> {
        let cache = self.cache.as_ref()?;
        match cache.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Cache load failed, treating as no prior snapshot");
                None
            }
        }
    }

    fn trigger_update(&self) {
        let callback = self
            .on_update
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Fires the UI callback when a `refresh` call ends, however it ends.
struct UpdateOnDrop<'a>(&'a Refresher);

impl Drop for UpdateOnDrop<'_> {
    fn drop(&mut self) {
        self.0.trigger_update();
    }
}

/// Rejects figures that cannot be a spend total.
fn check_usage(usage: Usage) -> Result<Usage, FetchError> {
    if usage.total.is_finite() && usage.total >= 0.0 {
        Ok(usage)
    } else {
        Err(FetchError::InvalidResponse(format!("invalid usage total {}", usage.total)))
    }
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("cache", &self.cache)
            .field("has_notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

/// Returns the spend since `previous` for a credential with digest `token_hash`.
///
/// Zero when there is no previous snapshot or it belongs to another
/// credential. Never negative.
pub fn compute_delta(previous: Option<&UsageSnapshot>, token_hash: &str, current_total: f64) -> f64 {
    previous
        .filter(|prev| prev.matches_key(token_hash))
        .map_or(0.0, |prev| (current_total - prev.total_usage).max(0.0))
}
