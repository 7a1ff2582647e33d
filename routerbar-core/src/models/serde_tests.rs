//! Serde tests for the on-disk cache record format.
//!
//! The cache file is read by older and newer builds alike, so its field
//! names and optionality are pinned here.

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use crate::{RuntimeState, SCHEMA_VERSION, StateMode, Usage, UsageSnapshot};

// ============================================================================
// UsageSnapshot Serde Tests
// ============================================================================

#[test]
fn test_snapshot_field_names() {
    let usage = Usage {
        total: 12.34,
        daily: Some(1.1),
        weekly: Some(2.2),
        monthly: Some(3.3),
        key_id: Some("key-id".to_string()),
        label: None,
    };
    let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let snap = UsageSnapshot::from_usage(&usage, "hash", at);

    let value = serde_json::to_value(&snap).unwrap();
    assert_eq!(value["schema_version"], json!(SCHEMA_VERSION));
    assert_eq!(value["last_success_at"], json!("2024-05-06T07:08:09Z"));
    assert_eq!(value["total_usage"], json!(12.34));
    assert_eq!(value["daily_usage"], json!(1.1));
    assert_eq!(value["weekly_usage"], json!(2.2));
    assert_eq!(value["monthly_usage"], json!(3.3));
    assert_eq!(value["key_hash"], json!("hash"));
    assert_eq!(value["key_id"], json!("key-id"));
}

#[test]
fn test_snapshot_absent_optionals_are_omitted() {
    let snap = UsageSnapshot::from_usage(&Usage::with_total(1.0), "", Utc::now());
    let value = serde_json::to_value(&snap).unwrap();
    let object = value.as_object().unwrap();

    for field in ["daily_usage", "weekly_usage", "monthly_usage", "key_hash", "key_id"] {
        assert!(!object.contains_key(field), "{field} should be omitted");
    }
}

#[test]
fn test_snapshot_parses_minimal_legacy_record() {
    let json = r#"{"last_success_at":"2024-01-01T00:00:00Z","total_usage":5}"#;
    let snap: UsageSnapshot = serde_json::from_str(json).unwrap();

    assert!(snap.schema_version.is_none());
    assert_eq!(snap.total_usage, 5.0);
    assert!(snap.daily_usage.is_none());
    assert!(snap.key_hash.is_none());
    assert!(snap.validate().is_ok());
}

#[test]
fn test_snapshot_zero_is_not_absent() {
    let json = r#"{"last_success_at":"2024-01-01T00:00:00Z","total_usage":0,"daily_usage":0}"#;
    let snap: UsageSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(snap.daily_usage, Some(0.0));
    assert_eq!(snap.weekly_usage, None);
}

#[test]
fn test_snapshot_missing_total_fails() {
    let json = r#"{"last_success_at":"2024-01-01T00:00:00Z"}"#;
    assert!(serde_json::from_str::<UsageSnapshot>(json).is_err());
}

// ============================================================================
// RuntimeState Serde Tests
// ============================================================================

#[test]
fn test_runtime_state_serializes_for_json_output() {
    let state = RuntimeState {
        usage: Usage::with_total(2.0),
        last_error: Some("boom".to_string()),
        ..RuntimeState::default()
    };
    let value: Value = serde_json::to_value(&state).unwrap();
    assert_eq!(value["usage"]["total"], json!(2.0));
    assert_eq!(value["last_error"], json!("boom"));
    assert_eq!(value["not_configured"], json!(false));
    assert_eq!(serde_json::to_value(state.mode()).unwrap(), json!("error"));
    assert_eq!(
        serde_json::to_value(StateMode::NotConfigured).unwrap(),
        json!("not_configured")
    );
}
