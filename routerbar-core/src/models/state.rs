//! Runtime refresh state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::usage::Usage;

/// Which of the mutually exclusive display modes is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMode {
    /// No credential has been supplied.
    NotConfigured,
    /// The last refresh failed; usage figures may be stale.
    Error,
    /// The last refresh succeeded (or nothing has failed yet).
    Normal,
}

/// Point-in-time copy of the in-memory state.
///
/// Readers always receive an owned copy; nothing here aliases the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuntimeState {
    /// When usage was last fetched successfully.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Last observed usage. Kept across errors.
    pub usage: Usage,
    /// Message of the last failed refresh, cleared on success.
    pub last_error: Option<String>,
    /// No credential is configured.
    pub not_configured: bool,
}

impl RuntimeState {
    /// Returns the current display mode.
    pub fn mode(&self) -> StateMode {
        if self.not_configured {
            StateMode::NotConfigured
        } else if self.has_error() {
            StateMode::Error
        } else {
            StateMode::Normal
        }
    }

    /// Returns true if an error message is present.
    pub fn has_error(&self) -> bool {
        self.last_error.as_deref().is_some_and(|e| !e.is_empty())
    }
}
