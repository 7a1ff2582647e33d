//! Plain-text summary for presentation layers.

use url::Url;

use crate::format::{format_time, format_usd};
use crate::models::{RuntimeState, StateMode};

/// Activity page on the `OpenRouter` site.
const ACTIVITY_URL: &str = "https://openrouter.ai/activity";

/// Message shown while no credential is configured.
pub const NOT_CONFIGURED_MESSAGE: &str = "Set token in Settings";

/// Renders the multi-line summary for a state snapshot.
///
/// `token_configured` reflects the live config, which may already have lost
/// its credential before the next refresh marks the state.
pub fn tooltip(state: &RuntimeState, token_configured: bool) -> String {
    if !token_configured || state.mode() == StateMode::NotConfigured {
        return NOT_CONFIGURED_MESSAGE.to_string();
    }

    let mut lines = vec![
        format!("Daily: {}", format_optional(state.usage.daily)),
        format!("Weekly: {}", format_optional(state.usage.weekly)),
        format!("Monthly: {}", format_optional(state.usage.monthly)),
        format!("Total: {}", format_usd(state.usage.total)),
        format!("Updated: {}", format_time(state.last_success_at)),
    ];
    if let Some(err) = state.last_error.as_deref().filter(|e| !e.is_empty()) {
        lines.push(format!("ERROR: {err} (stale)"));
    }
    lines.join("\n")
}

/// Returns the activity page URL, filtered to `key_id` when known.
pub fn activity_url(key_id: Option<&str>) -> String {
    match key_id.filter(|id| !id.is_empty()) {
        Some(id) => match Url::parse_with_params(ACTIVITY_URL, &[("api_key_id", id)]) {
            Ok(url) => url.to_string(),
            Err(_) => ACTIVITY_URL.to_string(),
        },
        None => ACTIVITY_URL.to_string(),
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), format_usd)
}
