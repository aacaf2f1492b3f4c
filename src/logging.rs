// src/logging.rs

//! Logging setup for `shrinkwrap` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--debug` (CLI or config file) selects `debug`
//! 3. `SHRINKWRAP_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Events are written through the [`ConsoleSink`], the same serialised
//! stream that carries child output, so a log line never splits a child line.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::console::ConsoleSink;

pub const LOG_ENV: &str = "SHRINKWRAP_LOG";

/// Initialise the global logging subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(console: ConsoleSink, cli_level: Option<LogLevel>, debug: bool) -> Result<()> {
    let env_level = std::env::var(LOG_ENV).ok();
    let level = select_level(cli_level, debug, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(console)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

fn select_level(cli_level: Option<LogLevel>, debug: bool, env_level: Option<&str>) -> Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None if debug => Level::DEBUG,
        None => env_level.and_then(parse_level_str).unwrap_or(Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
