//! Logging configuration for gardia.
//!
//! This module provides initialization for the tracing-based logging used by
//! the server, the radio link and the CLI.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events pass the default filter.
const LOGGED_TARGETS: [&str; 3] = ["gardia", "gardia_mesh", "tower_http"];

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Warnings and errors.
    Warnings,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above).
    Verbose,
    /// Very verbose output (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Warnings => Level::WARN,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Map a `logging.level` config value (`DEBUG`, `INFO`, `WARNING`,
    /// `ERROR`, `CRITICAL`, any case) to a verbosity. Unknown values map to
    /// [`Verbosity::Normal`].
    #[must_use]
    pub fn from_config_level(level: &str) -> Self {
        match level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Self::Trace,
            "DEBUG" => Self::Verbose,
            "WARN" | "WARNING" => Self::Warnings,
            "ERROR" | "CRITICAL" => Self::Quiet,
            _ => Self::Normal,
        }
    }

    fn directives(self) -> String {
        let level = self.to_level_filter();
        LOGGED_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initialize the logging system.
///
/// This should be called once at application startup. The logging level can be
/// controlled via:
/// 1. The `verbosity` parameter
/// 2. The `RUST_LOG` environment variable (takes precedence)
///
/// # Examples
///
/// ```no_run
/// use gardia::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_config_level("INFO"));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    // Already set when called twice; keep the first subscriber.
    let _ = subscriber.try_init();
}

/// Initialize logging for tests.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
