//! In-memory runtime state.
//!
//! Records the outcome of the most recent refresh. Presentation layers read
//! it through [`StateStore::snapshot`] and re-render when the version
//! published on [`StateStore::subscribe`] changes.

use chrono::{DateTime, Utc};
use routerbar_core::{RuntimeState, Usage};
use std::fmt::Display;
use std::sync::{PoisonError, RwLock};
use tokio::sync::watch;
use tracing::debug;

/// Thread-safe holder of the current [`RuntimeState`].
#[derive(Debug)]
pub struct StateStore {
    state: RwLock<RuntimeState>,
    notify: watch::Sender<u64>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Creates an empty store: no usage, no error, configured.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            state: RwLock::new(RuntimeState::default()),
            notify,
        }
    }

    /// Returns an owned copy of the current state.
    pub fn snapshot(&self) -> RuntimeState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Marks the monitor as lacking a credential and clears any error.
    pub fn set_not_configured(&self) {
        self.modify(|s| {
            s.not_configured = true;
            s.last_error = None;
        });
    }

    /// Clears the not-configured flag. Error and usage are left alone.
    pub fn clear_not_configured(&self) {
        self.modify(|s| s.not_configured = false);
    }

    /// Records a successful fetch and clears any error.
    pub fn set_success(&self, usage: Usage, at: DateTime<Utc>) {
        debug!(total = usage.total, "State updated with fresh usage");
        self.modify(|s| {
            s.usage = usage;
            s.last_success_at = Some(at);
            s.last_error = None;
            s.not_configured = false;
        });
    }

    /// Records a failed refresh. Usage and success time are kept.
    pub fn set_error(&self, err: impl Display) {
        let message = err.to_string();
        debug!(error = %message, "State updated with error");
        self.modify(|s| {
            s.not_configured = false;
            s.last_error = Some(message);
        });
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn modify(&self, f: impl FnOnce(&mut RuntimeState)) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state);
        }
        self.notify.send_modify(|version| *version += 1);
    }
}
