//! Logging setup
//!
//! Console output always goes to stderr. When `defaults.log_directory` is set,
//! a second layer writes to a daily rotated `archivist.log` in that directory,
//! as plain text or, with `defaults.log_json`, one JSON object per line.

use crate::config::{expand_tilde, Defaults};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Base name of the log files
pub const LOG_FILE_NAME: &str = "archivist.log";

/// File logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    /// Level for the file layer; the console follows `RUST_LOG` or INFO
    pub log_level: Level,
    /// Number of rotated files kept
    pub max_files: u32,
    /// Write the file log as JSON lines
    pub json: bool,
}

impl LoggingConfig {
    pub fn new(log_directory: &Path, log_level: &str, max_files: u32) -> Self {
        Self {
            log_directory: expand_tilde(log_directory),
            log_level: parse_level(log_level),
            max_files,
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// File logging settings, if a log directory is configured
    pub fn from_defaults(defaults: &Defaults) -> Option<Self> {
        defaults
            .log_directory
            .as_deref()
            .map(|dir| {
                Self::new(dir, &defaults.log_level, defaults.log_max_files)
                    .with_json(defaults.log_json)
            })
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize console and rotating file logging
///
/// Keep the returned guard alive; dropping it flushes the file writer.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    fs::create_dir_all(&config.log_directory).with_context(|| {
        format!(
            "Failed to create log directory: {}",
            config.log_directory.display()
        )
    })?;

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &config.log_directory, LOG_FILE_NAME);
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(level_filter(config.log_level))
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_filter(level_filter(config.log_level))
            .boxed()
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level_filter(Level::INFO));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    cleanup_old_logs(&config.log_directory, config.max_files)?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Console-only logging, used when no log directory is configured
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, repeated setup)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Keep only the newest `max_files` rotated log files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {}", log_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(LOG_FILE_NAME)
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        match fs::remove_file(file.path()) {
            Ok(()) => tracing::debug!("Removed old log file: {:?}", file.path()),
            Err(e) => tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e),
        }
    }

    Ok(())
}

/// Keeps the background log writer alive
pub struct LogGuard {
    _file_guard: WorkerGuard,
}
