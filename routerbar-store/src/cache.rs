//! Durable usage cache.
//!
//! Holds exactly one [`UsageSnapshot`]: the result of the last successful
//! fetch. The refresher reads it once per cycle to compute the spend delta
//! and replaces it wholesale after every successful fetch.

use routerbar_core::UsageSnapshot;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_cache_path, load_json_optional, save_json};

/// File-backed store for the last successful usage snapshot.
///
/// Loads and saves are serialized by an internal lock held across the file
/// I/O, so a load never observes a save in progress and two saves never
/// interleave.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CacheStore {
    /// Creates a cache store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a cache store at the default cache path.
    pub fn at_default_path() -> Self {
        Self::new(default_cache_path())
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached snapshot.
    ///
    /// A missing file is not an error and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` on read failure, `StoreError::Serialization`
    /// for a malformed record, and `StoreError::UnsupportedSchema` for a
    /// record written with an unknown schema version.
    pub async fn load(&self) -> Result<Option<UsageSnapshot>, StoreError> {
        let _guard = self.lock.lock().await;

        let snapshot: Option<UsageSnapshot> = load_json_optional(&self.path).await?;
        if let Some(ref snapshot) = snapshot {
            snapshot
                .validate()
                .map_err(|e| StoreError::UnsupportedSchema(e.to_string()))?;
            debug!(
                path = %self.path.display(),
                last_success_at = %snapshot.last_success_at,
                "Cache loaded"
            );
        }
        Ok(snapshot)
    }

    /// Replaces the cached snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be serialized or written. The
    /// previous record is left intact on failure.
    pub async fn save(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        save_json(&self.path, snapshot).await?;
        info!(path = %self.path.display(), total = snapshot.total_usage, "Cache saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use routerbar_core::{Usage, token_hash};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample_usage() -> Usage {
        Usage {
            total: 12.34,
            daily: Some(1.1),
            weekly: None,
            monthly: Some(3.3),
            key_id: Some("key-id".to_string()),
            label: None,
        }
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("costs_cache.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_reproduces_every_field() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("costs_cache.json"));
        let at = Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();
        let snapshot = UsageSnapshot::from_usage(&sample_usage(), &token_hash("token"), at);

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, snapshot);
        assert!(loaded.weekly_usage.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("costs_cache.json"));

        let first = UsageSnapshot::from_usage(&sample_usage(), "a", Utc::now());
        store.save(&first).await.unwrap();

        let second = UsageSnapshot::from_usage(&Usage::with_total(20.0), "b", Utc::now());
        store.save(&second).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.total_usage, 20.0);
        assert!(loaded.daily_usage.is_none());
        assert!(loaded.key_id.is_none());
        assert_eq!(loaded.key_hash.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_load_malformed_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("costs_cache.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = CacheStore::new(&path).load().await.unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_load_unknown_schema_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("costs_cache.json");
        tokio::fs::write(
            &path,
            r#"{"schema_version":"9","last_success_at":"2024-01-01T00:00:00Z","total_usage":1}"#,
        )
        .await
        .unwrap();

        let err = CacheStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedSchema(_)));
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_one_complete_record() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CacheStore::new(dir.path().join("costs_cache.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let usage = Usage::with_total(f64::from(i));
                let snapshot = UsageSnapshot::from_usage(&usage, "hash", Utc::now());
                store.save(&snapshot).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let loaded = store.load().await.unwrap().unwrap();
        assert!((0.0..8.0).contains(&loaded.total_usage));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind");
    }
}
