//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use routerbar_core::{RuntimeState, StateMode, Usage, activity_url};
use routerbar_store::Config;
use serde::{Serialize, Serializer};
use std::path::Path;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for the spend summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
    pub status: &'static str,
    pub total_usd: f64,
    pub daily_usd: Option<f64>,
    pub weekly_usd: Option<f64>,
    pub monthly_usd: Option<f64>,
    #[serde(serialize_with = "serialize_datetime_opt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub activity_url: String,
}

impl SummaryOutput {
    /// Builds the output for a state snapshot.
    pub fn from_state(state: &RuntimeState, token_configured: bool) -> Self {
        let status = if token_configured {
            status_name(state.mode())
        } else {
            status_name(StateMode::NotConfigured)
        };
        Self {
            status,
            total_usd: state.usage.total,
            daily_usd: state.usage.daily,
            weekly_usd: state.usage.weekly,
            monthly_usd: state.usage.monthly,
            updated_at: state.last_success_at,
            error: state.last_error.clone().filter(|e| !e.is_empty()),
            activity_url: activity_url(state.usage.key_id.as_deref()),
        }
    }
}

/// JSON output for a credential check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckOutput {
    /// Builds the output for a check result.
    pub fn from_result(result: &Result<Usage, String>) -> Self {
        match result {
            Ok(usage) => Self {
                valid: true,
                total_usd: Some(usage.total),
                label: usage.label.clone(),
                key_id: usage.key_id.clone(),
                error: None,
            },
            Err(e) => Self {
                valid: false,
                total_usd: None,
                label: None,
                key_id: None,
                error: Some(e.clone()),
            },
        }
    }
}

/// JSON output for `config show`. The credential is always redacted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOutput {
    pub path: String,
    pub token: String,
    pub token_configured: bool,
    pub period: String,
    pub update_on_start: bool,
    pub notifications: NotificationsOutput,
    pub log_level: String,
    pub log_to_file: bool,
}

/// Notification toggles.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsOutput {
    pub enabled: bool,
    pub on_update_spent: bool,
    pub on_error: bool,
    pub on_start_summary: bool,
}

impl ConfigOutput {
    /// Builds the output for `config` loaded from `path`.
    pub fn new(config: &Config, path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            token: config.connection.redacted_token(),
            token_configured: config.has_token(),
            period: config.updates.period.to_string(),
            update_on_start: config.updates.update_on_start,
            notifications: NotificationsOutput {
                enabled: config.notifications.enabled,
                on_update_spent: config.notifications.on_update_spent,
                on_error: config.notifications.on_error,
                on_start_summary: config.notifications.on_start_summary,
            },
            log_level: config.logging.level.to_string(),
            log_to_file: config.logging.to_file,
        }
    }
}

/// File locations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsOutput {
    pub config: String,
    pub cache: String,
    pub log: String,
}

fn status_name(mode: StateMode) -> &'static str {
    match mode {
        StateMode::NotConfigured => "not_configured",
        StateMode::Error => "error",
        StateMode::Normal => "ok",
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
