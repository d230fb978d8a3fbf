//! Logging configuration and the tracing bootstrap.
//!
//! Defines the [`LogFormat`] enumeration with parsing helpers that integrate
//! with Serde and `strum` derives, and [`init_logging`], which installs the
//! global subscriber writing to stderr.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::Config;

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured filter expression could not be parsed.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// The filter expression that was rejected.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A global subscriber was already installed.
    #[error("failed to install the global logger: {0}")]
    Install(String),
}

/// Installs the global tracing subscriber described by the configuration.
///
/// Output goes to stderr in all formats; stdout is reserved for the
/// native-messaging frames.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter expression is malformed or a
/// subscriber is already installed.
pub fn init_logging(config: &Config) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|error| LoggingError::Filter {
        filter: config.log_filter().to_owned(),
        message: error.to_string(),
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.log_format() {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|error| LoggingError::Install(error.to_string()))
}
