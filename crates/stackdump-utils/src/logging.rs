//! # Logging Utilities
//!
//! Logging infrastructure for Stackdump using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Pretty (development) and JSON (machine) output
//! - Environment variable configuration
//! - An optional log file next to the console output
//! - A file-only mode for crash handlers that must not touch the terminal
//!
//! Console output goes to **stderr**; stdout is reserved for rendered traces.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stackdump_utils::init_logging;
//!
//! // Initialize with default settings (reads from RUST_LOG env var)
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=stackdump_core=trace`)
//! - `STACKDUMP_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `STACKDUMP_LOG_FILE`: Optional path of an additional, daily-rotated log file

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// One JSON object per event
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
    /// Warning level (default for the CLI: degraded frames are not news)
    Warn,
    /// Info level
    Info,
    /// Debug level: per-frame degradation reasons, per-module translator outcomes
    Debug,
    /// Trace level: every loader answer
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

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `stackdump_core=debug`)
/// - `STACKDUMP_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `STACKDUMP_LOG_FILE`: Optional path to log file
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `STACKDUMP_LOG_FORMAT` holds an unknown format
/// - The log file directory cannot be created
pub fn init_logging() -> Result<(), LoggingError>
{
    let format = match env::var("STACKDUMP_LOG_FORMAT") {
        Ok(value) => LogFormat::from_str(&value).map_err(LoggingError::InvalidFormat)?,
        Err(_) => LogFormat::Pretty,
    };

    // RUST_LOG if it parses, WARN otherwise
    init_logging_internal(format, Level::WARN, EnvFilter::try_from_default_env().ok())
}

/// Initialize logging with explicit level and format
///
/// The level wins over `RUST_LOG`.
///
/// ## Example
///
/// ```rust,no_run
/// use stackdump_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    init_logging_internal(format, level.into(), None)
}

/// Initialize file-only logging
///
/// Nothing is written to the terminal. The log file is
/// `~/.stackdump/YYYY-MM-DD-stackdump.log`, or the same name under `/tmp` if
/// there is no home directory.
///
/// ## Arguments
///
/// * `level` - Optional log level. If `None`, uses `RUST_LOG` or defaults to `WARN`.
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the directory cannot
/// be created.
pub fn init_logging_to_file(level: Option<LogLevel>) -> Result<PathBuf, LoggingError>
{
    let today = Utc::now().format("%Y-%m-%d");
    let log_file = match env::var("HOME") {
        Ok(home) => {
            let dir = PathBuf::from(home).join(".stackdump");
            fs::create_dir_all(&dir)?;
            dir.join(format!("{today}-stackdump.log"))
        }
        Err(_) => PathBuf::from("/tmp").join(format!("{today}-stackdump.log")),
    };

    let filter = match level {
        Some(level) => EnvFilter::new(Level::from(level).to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string())),
    };

    // The date is already in the name, so the file never rotates.
    let appender = tracing_appender::rolling::never(parent_dir(&log_file), file_name(&log_file));
    let writer = leak_guard(appender);

    Registry::default()
        .with(vec![file_layer(LogFormat::Pretty, writer, filter)])
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(log_file)
}

fn init_logging_internal(format: LogFormat, default_level: Level, env_filter: Option<EnvFilter>) -> Result<(), LoggingError>
{
    // RUST_LOG can override the default level with more specific filters
    let env_filter = env_filter.unwrap_or_else(|| EnvFilter::new(default_level.to_string()));

    let mut layers = vec![console_layer(format, env_filter.clone())];

    if let Some(file_path) = env::var("STACKDUMP_LOG_FILE").ok().map(PathBuf::from) {
        if let Some(dir) = file_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let appender = tracing_appender::rolling::daily(parent_dir(&file_path), file_name(&file_path));
        layers.push(file_layer(format, leak_guard(appender), env_filter));
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
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
            .with_thread_ids(true)
            .with_thread_names(true)
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

fn file_layer(format: LogFormat, writer: NonBlocking, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Wrap `appender` in a background writer that lives until process exit.
fn leak_guard<W>(appender: W) -> NonBlocking
where
    W: io::Write + Send + 'static,
{
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    // Dropping the guard stops the writer thread.
    std::mem::forget(guard);
    non_blocking
}

fn parent_dir(path: &Path) -> PathBuf
{
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_name(path: &Path) -> PathBuf
{
    path.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("stackdump.log"))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("dev").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("prod").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("WARNING").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
    }

    #[test]
    fn test_log_file_path_parts()
    {
        assert_eq!(parent_dir(Path::new("stackdump.log")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/var/log/sd.log")), PathBuf::from("/var/log"));
        assert_eq!(file_name(Path::new("/var/log/sd.log")), PathBuf::from("sd.log"));
    }
}
