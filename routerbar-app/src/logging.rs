//! Tracing subscriber setup.
//!
//! Logs go to stderr and, when enabled in the config, are also appended to
//! the log file. Both the level and the file output can change at runtime.

use routerbar_store::{LogLevel, LoggingConfig};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Builds the filter for `level`, keeping HTTP internals quiet.
pub fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::new(format!("{level},hyper=warn,reqwest=warn,rustls=warn"))
}

// ============================================================================
// Log File Writer
// ============================================================================

/// A log file that can be attached and detached while the subscriber runs.
#[derive(Debug, Clone, Default)]
pub struct LogFile {
    file: Arc<Mutex<Option<File>>>,
}

impl LogFile {
    /// Opens `path` for appending, creating it with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path)?;
        *self.lock() = Some(file);
        Ok(())
    }

    /// Detaches the current file, if any.
    pub fn close(&self) {
        if let Some(mut file) = self.lock().take() {
            let _ = file.flush();
        }
    }

    /// Returns true while a file is attached.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writer handed out per event. Discards output while no file is attached.
pub struct LogFileWriter<'a>(MutexGuard<'a, Option<File>>);

impl Write for LogFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter(self.lock())
    }
}

// ============================================================================
// Subscriber
// ============================================================================

/// Handle for adjusting logging after initialization.
#[derive(Debug, Clone)]
pub struct LoggingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    file: LogFile,
    log_path: PathBuf,
    env_override: bool,
}

impl LoggingHandle {
    /// Applies `config`: new level unless `RUST_LOG` is set, file on or off.
    pub fn apply(&self, config: &LoggingConfig) {
        if !self.env_override {
            if let Err(e) = self.filter.reload(filter_for(config.level)) {
                warn!(error = %e, "Failed to change log level");
            }
        }

        match (config.to_file, self.file.is_open()) {
            (true, false) => match self.file.open(&self.log_path) {
                Ok(()) => debug!(path = %self.log_path.display(), "Logging to file"),
                Err(e) => warn!(path = %self.log_path.display(), error = %e, "Failed to open log file"),
            },
            (false, true) => self.file.close(),
            _ => {}
        }
    }
}

/// Installs the global subscriber and applies `config`.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init(config: &LoggingConfig, log_path: PathBuf) -> LoggingHandle {
    let (initial, env_override) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (filter_for(config.level), false),
    };
    let (filter_layer, filter) = reload::Layer::new(initial);
    let file = LogFile::default();

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file.clone()))
        .try_init();

    let handle = LoggingHandle {
        filter,
        file,
        log_path,
        env_override,
    };
    if installed.is_err() {
        debug!("Global subscriber already installed");
    }
    handle.apply(config);
    handle
}
