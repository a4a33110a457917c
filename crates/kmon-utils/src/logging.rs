//! # Logging Utilities
//!
//! Logging infrastructure for kmon using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Pretty (development) or JSON output
//! - Environment variable configuration
//! - Log level filtering
//! - An optional log file next to the console output
//!
//! Console logs go to **stderr**. Stdout belongs to the monitor prompt and
//! command output, so piping `kmon` into a file captures only monitor text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kmon_utils::init_logging;
//!
//! // Keep the guard alive for the lifetime of the program.
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=kmon_core=trace`)
//! - `KMON_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `KMON_LOG_FILE`: Optional log file, or a directory to hold dated log files
//!
//! ## Examples
//!
//! ```rust,no_run
//! use kmon_utils::{LogFormat, LogLevel, init_logging_with_level};
//!
//! let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
//!     .expect("Failed to initialize logging");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "KMON_LOG_FORMAT";

/// Environment variable naming the log file or directory.
pub const LOG_FILE_ENV: &str = "KMON_LOG_FILE";

/// Level used when neither the caller nor `RUST_LOG` picks one. The console is
/// shared with the monitor, so only problems are shown by default.
pub const DEFAULT_LEVEL: LogLevel = LogLevel::Warn;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default)
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Keeps the background file writer alive.
///
/// Dropping the guard flushes and stops file logging; console logging is
/// unaffected.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    _file_writer: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LoggingGuard
{
    /// File receiving a copy of the logs, if any.
    pub fn log_file(&self) -> Option<&Path>
    {
        self.log_file.as_deref()
    }
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `kmon_core=trace`)
/// - `KMON_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `KMON_LOG_FILE`: Optional log file or directory
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `KMON_LOG_FORMAT` holds an unknown format
/// - File logging fails (if `KMON_LOG_FILE` is set)
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var(LOG_FORMAT_ENV) {
        Ok(value) => LogFormat::from_str(&value).map_err(LoggingError::InvalidFormat)?,
        Err(_) => LogFormat::default(),
    };
    init_logging_internal(format, None)
}

/// Initialize logging with explicit level and format
///
/// An explicit level wins over `RUST_LOG`.
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, Some(level.into()))
}

/// Initialize logging with an explicit format, keeping `RUST_LOG` for the
/// level
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_format(format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, None)
}

/// Build the filter.
///
/// Priority:
/// 1. An explicit level (from the `--log-level` CLI flag)
/// 2. `RUST_LOG`, including module-specific filters like `kmon_core=trace`
/// 3. [`DEFAULT_LEVEL`]
fn build_filter(explicit_level: Option<Level>) -> Result<EnvFilter, LoggingError>
{
    if let Some(level) = explicit_level {
        return Ok(EnvFilter::new(level.to_string()));
    }
    match env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::try_new(&rust_log).map_err(|err| LoggingError::InvalidLevel(format!("{rust_log}: {err}"))),
        Err(_) => Ok(EnvFilter::new(Level::from(DEFAULT_LEVEL).to_string())),
    }
}

/// Resolve `KMON_LOG_FILE`: a directory gets a dated file name.
fn resolve_log_file(value: &str) -> PathBuf
{
    let path = PathBuf::from(value);
    if path.is_dir() {
        let today = Utc::now().format("%Y-%m-%d");
        return path.join(format!("{today}-kmon.log"));
    }
    path
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, filter: EnvFilter, log_file: &Path) -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory).map_err(LoggingError::FileError)?;
    let file_name = log_file
        .file_name()
        .ok_or_else(|| LoggingError::InitializationFailed(format!("{} is not a file path", log_file.display())))?;

    // The dated name already separates runs, so the file never rolls.
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    };
    Ok((layer, guard))
}

/// Internal initialization function
fn init_logging_internal(format: LogFormat, explicit_level: Option<Level>) -> Result<LoggingGuard, LoggingError>
{
    let filter = build_filter(explicit_level)?;
    let log_file = env::var(LOG_FILE_ENV).ok().filter(|value| !value.is_empty()).map(|value| resolve_log_file(&value));

    let mut layers = vec![console_layer(format, filter.clone())];
    let mut guard = LoggingGuard::default();
    if let Some(path) = log_file {
        let (layer, file_writer) = file_layer(format, filter, &path)?;
        layers.push(layer);
        guard._file_writer = Some(file_writer);
        guard.log_file = Some(path);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
