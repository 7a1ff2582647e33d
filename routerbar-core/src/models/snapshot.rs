//! The persisted usage cache record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::usage::Usage;
use crate::error::CoreError;

/// Schema version written into every new cache record.
pub const SCHEMA_VERSION: &str = "1";

/// The single persisted record of the most recent successful fetch.
///
/// Saved wholesale on every successful refresh; never merged with the
/// previous record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Schema version tag. Records written before versioning carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// When the fetch that produced this record succeeded.
    pub last_success_at: DateTime<Utc>,
    /// Cumulative usage in USD.
    pub total_usage: f64,
    /// Daily usage, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_usage: Option<f64>,
    /// Weekly usage, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_usage: Option<f64>,
    /// Monthly usage, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_usage: Option<f64>,
    /// SHA-256 hex digest of the credential that produced this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hash: Option<String>,
    /// Opaque key identifier reported upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl UsageSnapshot {
    /// Builds a record for `usage` fetched at `at` with credential digest `key_hash`.
    pub fn from_usage(usage: &Usage, key_hash: &str, at: DateTime<Utc>) -> Self {
        Self {
            schema_version: Some(SCHEMA_VERSION.to_string()),
            last_success_at: at,
            total_usage: usage.total,
            daily_usage: usage.daily,
            weekly_usage: usage.weekly,
            monthly_usage: usage.monthly,
            key_hash: (!key_hash.is_empty()).then(|| key_hash.to_string()),
            key_id: usage.key_id.clone(),
        }
    }

    /// Converts the record back into usage figures.
    ///
    /// The label is not persisted and comes back as `None`.
    pub fn to_usage(&self) -> Usage {
        Usage {
            total: self.total_usage,
            daily: self.daily_usage,
            weekly: self.weekly_usage,
            monthly: self.monthly_usage,
            key_id: self.key_id.clone(),
            label: None,
        }
    }

    /// Returns true if this record was produced by the credential with digest `key_hash`.
    pub fn matches_key(&self, key_hash: &str) -> bool {
        !key_hash.is_empty() && self.key_hash.as_deref() == Some(key_hash)
    }

    /// Checks that the schema version is one this build can interpret.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` for an unknown schema version.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self.schema_version.as_deref() {
            None | Some(SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(CoreError::InvalidData(format!(
                "unsupported schema version {other:?}"
            ))),
        }
    }
}
