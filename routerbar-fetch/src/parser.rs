//! Tolerant decoder for the `/auth/key` response.
//!
//! Well-known shapes are tried first (`data.usage`, then `key.usage`).
//! Failing those, the first object anywhere in the document that carries a
//! `usage` field is used. Numbers may arrive as JSON numbers or numeric
//! strings.

use routerbar_core::Usage;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::FetchError;

/// Field holding the cumulative usage.
const USAGE_FIELD: &str = "usage";

/// Envelope keys checked before falling back to a recursive search.
const ENVELOPES: [&str; 2] = ["data", "key"];

/// Parses a response body into usage figures.
///
/// # Errors
///
/// Returns `FetchError::Json` if the body is not JSON, and
/// `FetchError::InvalidResponse` if no usage object is found or its
/// `usage` value is not a non-negative number. Negative optional figures
/// are dropped.
pub fn parse_usage(body: &str) -> Result<Usage, FetchError> {
    let payload: Value = serde_json::from_str(body)?;

    let usage_map = match well_known_usage_map(&payload) {
        Some(map) => map,
        None => {
            debug!("usage not in a known envelope, searching response");
            find_usage_map(&payload).ok_or_else(|| {
                FetchError::InvalidResponse("usage field not found in response".to_string())
            })?
        }
    };

    let total = usage_map
        .get(USAGE_FIELD)
        .and_then(to_f64)
        .ok_or_else(|| FetchError::InvalidResponse("usage value missing or invalid".to_string()))?;

    if total < 0.0 {
        return Err(FetchError::InvalidResponse(format!("negative usage total {total}")));
    }

    Ok(Usage {
        total,
        daily: non_negative(usage_map, "usage_daily"),
        weekly: non_negative(usage_map, "usage_weekly"),
        monthly: non_negative(usage_map, "usage_monthly"),
        key_id: first_string(usage_map, &["id", "key_id", "api_key_id"]),
        label: first_string(usage_map, &["name", "label"]),
    })
}

fn well_known_usage_map(payload: &Value) -> Option<&Map<String, Value>> {
    let top = payload.as_object()?;
    ENVELOPES.iter().find_map(|envelope| {
        top.get(*envelope)
            .and_then(Value::as_object)
            .filter(|inner| inner.contains_key(USAGE_FIELD))
    })
}

fn find_usage_map(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) => {
            if map.contains_key(USAGE_FIELD) {
                return Some(map);
            }
            map.values().find_map(find_usage_map)
        }
        Value::Array(items) => items.iter().find_map(find_usage_map),
        _ => None,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn non_negative(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(to_f64).filter(|v| *v >= 0.0)
}

fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
