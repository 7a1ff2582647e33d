//! Usage totals as reported upstream.

use serde::{Deserialize, Serialize};

/// Usage figures for one API credential.
///
/// Optional figures are `None` when upstream did not report them, which is
/// distinct from a reported zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Cumulative usage in USD.
    pub total: f64,
    /// Usage for the current day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily: Option<f64>,
    /// Usage for the current week.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly: Option<f64>,
    /// Usage for the current month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly: Option<f64>,
    /// Opaque account/key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    /// Human-readable key label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Usage {
    /// Creates usage with only a total.
    pub fn with_total(total: f64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }
}
