//! Refresh cycle tests against an in-memory fetcher.

use chrono::Utc;
use routerbar_core::{StateMode, Usage, UsageSnapshot, token_hash};
use routerbar_store::{CacheStore, Config, ConfigStore, NotificationsConfig, StateStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::error::RefreshError;
use crate::notifications::{Notifier, RecordingSink};
use crate::refresh::{Refresher, compute_delta};
use crate::test_support::{Reply, StubFetcher};

// ============================================================================
// Fixtures
// ============================================================================

fn full_usage() -> Usage {
    Usage {
        total: 12.34,
        daily: Some(1.1),
        weekly: Some(2.2),
        monthly: Some(3.3),
        key_id: Some("key-id".to_string()),
        label: None,
    }
}

fn notifications_on() -> NotificationsConfig {
    NotificationsConfig {
        enabled: true,
        on_update_spent: true,
        on_error: true,
        on_start_summary: false,
    }
}

struct Harness {
    _dir: TempDir,
    refresher: Refresher,
    fetcher: Arc<StubFetcher>,
    config: Arc<ConfigStore>,
    state: Arc<StateStore>,
    cache: Arc<CacheStore>,
    sink: Arc<RecordingSink>,
    updates: Arc<AtomicUsize>,
}

fn harness(token: &str, replies: Vec<Reply>) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.connection.token = token.to_string();
    config.notifications = notifications_on();

    let config = Arc::new(ConfigStore::new(dir.path().join("config.json"), config));
    let state = Arc::new(StateStore::new());
    let cache = Arc::new(CacheStore::new(dir.path().join("costs_cache.json")));
    let sink = Arc::new(RecordingSink::new());
    let notifier = Arc::new(Notifier::new(notifications_on(), sink.clone()));
    let fetcher = StubFetcher::with(replies);

    let refresher = Refresher::new(fetcher.clone(), config.clone(), state.clone())
        .with_cache(cache.clone())
        .with_notifier(notifier);

    let updates = Arc::new(AtomicUsize::new(0));
    let counter = updates.clone();
    refresher.set_update_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    Harness {
        _dir: dir,
        refresher,
        fetcher,
        config,
        state,
        cache,
        sink,
        updates,
    }
}

// ============================================================================
// Delta
// ============================================================================

#[test]
fn test_delta_zero_without_previous() {
    assert_eq!(compute_delta(None, "hash", 10.0), 0.0);
}

#[test]
fn test_delta_zero_when_hash_differs() {
    let prev = UsageSnapshot::from_usage(&Usage::with_total(1.0), "old", Utc::now());
    for current in [0.0, 0.5, 1.0, 100.0] {
        assert_eq!(compute_delta(Some(&prev), "new", current), 0.0);
    }
}

#[test]
fn test_delta_zero_when_previous_has_no_hash() {
    let prev = UsageSnapshot::from_usage(&Usage::with_total(1.0), "", Utc::now());
    assert_eq!(compute_delta(Some(&prev), "", 5.0), 0.0);
    assert_eq!(compute_delta(Some(&prev), "hash", 5.0), 0.0);
}

#[test]
fn test_delta_matching_hash() {
    let prev = UsageSnapshot::from_usage(&Usage::with_total(10.0), "h", Utc::now());
    assert!((compute_delta(Some(&prev), "h", 12.5) - 2.5).abs() < 1e-9);
    assert_eq!(compute_delta(Some(&prev), "h", 10.0), 0.0);
    assert_eq!(compute_delta(Some(&prev), "h", 7.0), 0.0);
}

// ============================================================================
// Refresh Cycle
// ============================================================================

#[tokio::test]
async fn test_empty_token_is_not_configured() {
    let h = harness("", vec![]);

    let err = h.refresher.refresh(CancellationToken::new()).await.unwrap_err();

    assert!(err.is_not_configured());
    assert_eq!(h.state.snapshot().mode(), StateMode::NotConfigured);
    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.updates.load(Ordering::SeqCst), 1);
    assert!(!h.cache.path().exists());
}

#[tokio::test]
async fn test_whitespace_token_is_not_configured() {
    let h = harness("   ", vec![]);
    let err = h.refresher.refresh(CancellationToken::new()).await.unwrap_err();
    assert!(err.is_not_configured());
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_padded_token_is_fetched_and_hashed_trimmed() {
    let h = harness("  token\n", vec![Reply::Usage(full_usage())]);

    h.refresher.refresh(CancellationToken::new()).await.unwrap();

    assert_eq!(h.fetcher.tokens(), vec!["token".to_string()]);
    let cached = h.cache.load().await.unwrap().unwrap();
    assert_eq!(cached.key_hash, Some(token_hash("token")));
}

#[tokio::test]
async fn test_success_writes_cache_with_key_hash() {
    let h = harness("token", vec![Reply::Usage(full_usage())]);

    h.refresher.refresh(CancellationToken::new()).await.unwrap();

    let cached = h.cache.load().await.unwrap().unwrap();
    assert_eq!(cached.total_usage, 12.34);
    assert_eq!(cached.key_id.as_deref(), Some("key-id"));
    assert_eq!(cached.key_hash, Some(token_hash("token")));
    assert_eq!(cached.daily_usage, Some(1.1));

    let raw = std::fs::read_to_string(h.cache.path()).unwrap();
    assert!(!raw.contains("\"token\""));

    let state = h.state.snapshot();
    assert_eq!(state.mode(), StateMode::Normal);
    assert!(state.last_error.is_none());
    assert_eq!(state.usage, full_usage());
    assert!(state.last_success_at.is_some());
    assert_eq!(h.updates.load(Ordering::SeqCst), 1);

    // First sighting of a credential is never reported as spend.
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn test_auth_failure_leaves_cache_untouched() {
    let h = harness("token", vec![Reply::Unauthorized]);

    let err = h.refresher.refresh(CancellationToken::new()).await.unwrap_err();

    assert!(err.is_auth());
    let state = h.state.snapshot();
    assert_eq!(state.last_error.as_deref(), Some("openrouter unauthorized"));
    assert_eq!(state.mode(), StateMode::Error);
    assert!(!h.cache.path().exists());
    assert_eq!(h.updates.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.sink.bodies(),
        vec!["Error: openrouter unauthorized (retrying on schedule)"]
    );
}

#[tokio::test]
async fn test_error_preserves_stale_usage_and_cache() {
    let h = harness("token", vec![Reply::Usage(full_usage()), Reply::Unauthorized]);

    h.refresher.refresh(CancellationToken::new()).await.unwrap();
    let before = std::fs::read(h.cache.path()).unwrap();
    h.refresher.refresh(CancellationToken::new()).await.unwrap_err();

    let state = h.state.snapshot();
    assert_eq!(state.usage.total, 12.34);
    assert!(state.has_error());
    assert_eq!(std::fs::read(h.cache.path()).unwrap(), before);
    assert_eq!(h.updates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_spend_notified_on_increase() {
    let h = harness(
        "token",
        vec![
            Reply::Usage(Usage::with_total(10.0)),
            Reply::Usage(Usage::with_total(12.5)),
        ],
    );

    h.refresher.refresh(CancellationToken::new()).await.unwrap();
    h.refresher.refresh(CancellationToken::new()).await.unwrap();

    assert_eq!(h.sink.bodies(), vec!["Recently spent: $2.500"]);
}

#[tokio::test]
async fn test_decrease_is_not_notified() {
    let h = harness(
        "token",
        vec![
            Reply::Usage(Usage::with_total(10.0)),
            Reply::Usage(Usage::with_total(4.0)),
        ],
    );

    h.refresher.refresh(CancellationToken::new()).await.unwrap();
    h.refresher.refresh(CancellationToken::new()).await.unwrap();

    assert!(h.sink.sent().is_empty());
    assert_eq!(h.cache.load().await.unwrap().unwrap().total_usage, 4.0);
}

#[tokio::test]
async fn test_token_rotation_resets_delta() {
    let h = harness(
        "old-token",
        vec![
            Reply::Usage(Usage::with_total(1.0)),
            Reply::Usage(Usage::with_total(50.0)),
        ],
    );

    h.refresher.refresh(CancellationToken::new()).await.unwrap();
    h.config.update(|c| c.connection.token = "new-token".to_string());
    h.refresher.refresh(CancellationToken::new()).await.unwrap();

    assert!(h.sink.sent().is_empty());
    let cached = h.cache.load().await.unwrap().unwrap();
    assert_eq!(cached.key_hash, Some(token_hash("new-token")));
    assert_eq!(
        h.fetcher.tokens(),
        vec!["old-token".to_string(), "new-token".to_string()]
    );
}

#[tokio::test]
async fn test_corrupt_cache_treated_as_no_previous() {
    let h = harness("token", vec![Reply::Usage(Usage::with_total(99.0))]);
    tokio::fs::write(h.cache.path(), "{broken").await.unwrap();

    h.refresher.refresh(CancellationToken::new()).await.unwrap();

    assert!(h.sink.sent().is_empty());
    assert_eq!(h.cache.load().await.unwrap().unwrap().total_usage, 99.0);
}

#[tokio::test]
async fn test_cache_save_failure_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let mut config = Config::default();
    config.connection.token = "token".to_string();
    let config = Arc::new(ConfigStore::new(dir.path().join("config.json"), config));
    let state = Arc::new(StateStore::new());
    let cache = Arc::new(CacheStore::new(blocker.join("costs_cache.json")));
    let fetcher = StubFetcher::with(vec![Reply::Usage(Usage::with_total(3.0))]);

    let refresher = Refresher::new(fetcher, config, state.clone()).with_cache(cache);
    refresher.refresh(CancellationToken::new()).await.unwrap();

    assert_eq!(state.snapshot().usage.total, 3.0);
    assert_eq!(state.snapshot().mode(), StateMode::Normal);
}

#[tokio::test]
async fn test_works_without_cache_or_notifier() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.connection.token = "token".to_string();
    let config = Arc::new(ConfigStore::new(dir.path().join("config.json"), config));
    let state = Arc::new(StateStore::new());
    let fetcher = StubFetcher::with(vec![Reply::Usage(Usage::with_total(1.0))]);

    let refresher = Refresher::new(fetcher, config, state.clone());
    refresher.refresh(CancellationToken::new()).await.unwrap();

    assert_eq!(state.snapshot().usage.total, 1.0);
}

#[tokio::test]
async fn test_test_token_does_not_mutate() {
    let h = harness("configured", vec![Reply::Usage(full_usage())]);

    let usage = h.refresher
        .test_token(CancellationToken::new(), "candidate")
        .await
        .unwrap();

    assert_eq!(usage, full_usage());
    assert_eq!(h.state.snapshot(), routerbar_core::RuntimeState::default());
    assert!(!h.cache.path().exists());
    assert_eq!(h.updates.load(Ordering::SeqCst), 0);
    assert_eq!(h.fetcher.tokens(), vec!["candidate".to_string()]);
}

#[tokio::test]
async fn test_negative_total_is_rejected_and_keeps_baseline() {
    let h = harness(
        "token",
        vec![
            Reply::Usage(Usage::with_total(10.0)),
            Reply::Usage(Usage::with_total(-5.0)),
            Reply::Usage(Usage::with_total(10.0)),
        ],
    );

    h.refresher.refresh(CancellationToken::new()).await.unwrap();
    let err = h
        .refresher
        .refresh(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RefreshError::Fetch(_)));
    assert!(h.state.snapshot().has_error());
    assert_eq!(h.state.snapshot().usage.total, 10.0);
    assert_eq!(h.cache.load().await.unwrap().unwrap().total_usage, 10.0);

    h.refresher.refresh(CancellationToken::new()).await.unwrap();
    assert!(h.sink.bodies().iter().all(|b| !b.starts_with("Recently spent")));
    assert_eq!(h.updates.load(Ordering::SeqCst), 3);
}

// ============================================================================
// Cancellation and Concurrency
// ============================================================================

#[tokio::test]
async fn test_test_token_honors_cancellation() {
    let h = harness("configured", vec![Reply::Hang]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h
        .refresher
        .test_token(cancel, "candidate")
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::Cancelled));
    assert_eq!(h.state.snapshot(), routerbar_core::RuntimeState::default());
}

#[tokio::test]
async fn test_dropped_refresh_still_fires_callback() {
    let h = harness("token", vec![Reply::Hang]);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        h.refresher.refresh(CancellationToken::new()),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(h.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_fetch_records_error_without_alert() {
    let h = harness("token", vec![Reply::Hang]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = h.refresher.refresh(cancel).await.unwrap_err();

    assert!(matches!(err, RefreshError::Cancelled));
    assert!(h.state.snapshot().has_error());
    assert!(h.sink.sent().is_empty());
    assert_eq!(h.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_with_timeout_bounds_hung_fetch() {
    let h = harness("token", vec![Reply::Hang]);

    let started = std::time::Instant::now();
    let err = h
        .refresher
        .refresh_with_timeout(Duration::from_millis(30))
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(h.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_overlapping_refreshes_each_run_a_full_cycle() {
    let h = harness(
        "token",
        vec![
            Reply::Usage(Usage::with_total(1.0)),
            Reply::Usage(Usage::with_total(2.0)),
        ],
    );

    let (a, b) = tokio::join!(
        h.refresher.refresh(CancellationToken::new()),
        h.refresher.refresh(CancellationToken::new())
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(h.fetcher.calls(), 2);
    assert_eq!(h.updates.load(Ordering::SeqCst), 2);
    assert_eq!(h.cache.load().await.unwrap().unwrap().total_usage, 2.0);
    assert_eq!(h.sink.bodies(), vec!["Recently spent: $1.000"]);
}
