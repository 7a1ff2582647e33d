//! File persistence helpers.
//!
//! Every write goes to a temporary file in the destination directory, is
//! flushed to disk, then renamed over the destination. Readers therefore see
//! either the old record or the new one, never a partial write.

use serde::{Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Application directory name under the platform config/cache roots.
const APP_DIR_NAME: &str = "routerbar";

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.json";

/// Cache file name.
const CACHE_FILE_NAME: &str = "costs_cache.json";

/// Log file name.
const LOG_FILE_NAME: &str = "routerbar.log";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "ROUTERBAR_CONFIG";

/// Environment variable overriding the cache file path.
pub const CACHE_PATH_ENV: &str = "ROUTERBAR_CACHE";

/// Distinguishes temp files from concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/routerbar`
/// - Linux: `~/.config/routerbar`
/// - Windows: `%APPDATA%\routerbar`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default cache directory.
///
/// - macOS: `~/Library/Caches/routerbar`
/// - Linux: `~/.cache/routerbar`
/// - Windows: `%LOCALAPPDATA%\routerbar`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|c| c.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the config file path, honoring `ROUTERBAR_CONFIG`.
pub fn default_config_path() -> PathBuf {
    env_path(CONFIG_PATH_ENV).unwrap_or_else(|| default_config_dir().join(CONFIG_FILE_NAME))
}

/// Returns the usage cache file path, honoring `ROUTERBAR_CACHE`.
pub fn default_cache_path() -> PathBuf {
    env_path(CACHE_PATH_ENV).unwrap_or_else(|| default_cache_dir().join(CACHE_FILE_NAME))
}

/// Returns the log file path.
pub fn default_log_path() -> PathBuf {
    default_config_dir().join(LOG_FILE_NAME)
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets restrictive directory permissions (0o700) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o700);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0700", "Set restrictive directory permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates the parent directory with restrictive permissions if missing.
async fn create_secure_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !tokio::fs::try_exists(parent).await? {
            debug!(path = %parent.display(), "Creating secure directory");
            tokio::fs::create_dir_all(parent).await?;
            set_restrictive_dir_permissions(parent).await?;
        }
    }
    Ok(())
}

/// Builds a unique temp path next to `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "data".into(), |n| n.to_string_lossy().into_owned());
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

/// Opens a fresh temp file with owner-only permissions.
async fn create_temp_file(path: &Path) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

/// Writes `data` to `path` atomically.
///
/// The data is written and synced to a temp file in the same directory, then
/// renamed over `path`. If the rename fails, a stale destination is removed
/// and the rename retried once. The temp file never outlives the call.
///
/// # Errors
///
/// Returns `StoreError::Io` if any step fails; the previous contents of
/// `path` are left intact in that case.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    create_secure_parent_dir(path).await?;

    let temp = TempFile::new(temp_path_for(path));
    write_then_rename(&temp.path, path, data).await?;
    temp.persisted();
    Ok(())
}

/// Removes its temp file on drop unless the file was renamed into place.
///
/// Covers error returns and a cancelled write alike.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn persisted(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}

async fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut file = create_temp_file(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(first) = tokio::fs::rename(temp_path, path).await {
        debug!(path = %path.display(), error = %first, "Rename failed, replacing destination");
        let _ = tokio::fs::remove_file(path).await;
        tokio::fs::rename(temp_path, path).await?;
    }
    Ok(())
}

/// Saves data to a JSON file atomically with owner-only permissions.
///
/// # Errors
///
/// Returns error if serialization or any file operation fails.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    let json = serde_json::to_vec_pretty(data)?;
    write_atomic(path, &json).await?;

    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
///
/// # Errors
///
/// Returns error if the file cannot be read or decoded.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read(path).await?;
    let data = serde_json::from_slice(&content)?;

    debug!(path = %path.display(), "JSON file loaded");
    Ok(data)
}

/// Loads data from a JSON file, returning `None` if it does not exist.
///
/// # Errors
///
/// Returns error for any failure other than a missing file.
pub async fn load_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match load_json(path).await {
        Ok(data) => Ok(Some(data)),
        Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "File not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Tests
// ============================================================================
