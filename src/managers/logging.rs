//! Logging setup with file rotation
//!
//! Provides dual-output logging:
//! - Console: INFO level with concise format
//! - File (optional): configured level, daily rotation, old files pruned,
//!   plain text or one JSON object per event

use crate::config::LogSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "backup-orchestrator.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files; console only when `None`
    pub log_directory: Option<PathBuf>,
    /// Log level for file output (console always uses INFO)
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
    /// Write file events as JSON lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_level: Level::DEBUG,
            max_files: 10,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Create from the `[logging]` section
    pub fn from_settings(settings: &LogSettings) -> Self {
        Self {
            log_directory: settings.directory.clone(),
            log_level: parse_level(&settings.level),
            max_files: settings.max_files,
            json: settings.json,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with console and optional file outputs
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let (subscriber, file_guard) = build_subscriber(config)?;
    subscriber.init();

    if let Some(ref log_dir) = config.log_directory {
        cleanup_old_logs(log_dir, config.max_files)?;
    }

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Console layer stacked on an optional rolling file layer
fn build_subscriber(
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>)> {
    let mut file_guard = None;

    let file_layer = match config.log_directory {
        Some(ref log_dir) => {
            fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

            let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guard = Some(guard);

            let layer = if config.json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_current_span(false)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false) // No colors in file
                    .with_target(true)
                    .boxed()
            };
            Some(layer.with_filter(level_filter(config.log_level)))
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .with_filter(level_filter(Level::INFO));

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer);

    Ok((subscriber, file_guard))
}

/// Initialize simple console-only logging (for when config isn't available)
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

/// Create a level filter for tracing layers; `RUST_LOG` wins when set
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Cleanup old log files, keeping only the most recent N files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX))
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}
