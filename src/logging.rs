//! Tracing subscriber setup for the harness binaries.
//!
//! Logs go to stderr so that stdout carries only command output.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line human-readable output.
    Compact,
    /// Machine-parseable JSON lines.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnknownFormat(other.to_owned())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Raised when the requested format is not recognised.
    #[error("unknown log format '{0}', expected 'pretty', 'compact', or 'json'")]
    UnknownFormat(String),
    /// Raised when the level directive cannot be parsed.
    #[error("invalid log level '{level}': {message}")]
    InvalidLevel {
        /// Directive supplied by the caller.
        level: String,
        /// Parser message.
        message: String,
    },
    /// Raised when a global subscriber is already installed.
    #[error("failed to initialise tracing subscriber: {0}")]
    Init(String),
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. Must be called once,
/// before any tracing macros are used.
///
/// # Errors
///
/// Returns [`LoggingError`] when `level` is not a valid filter directive or a
/// subscriber is already installed.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|err| LoggingError::InvalidLevel {
            level: level.to_owned(),
            message: err.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let writer = std::io::stderr;
    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(writer))
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(writer))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init(),
    };
    result.map_err(|err| LoggingError::Init(err.to_string()))
}
