//! Runtime configuration for the eID agent.
//!
//! The agent is stateless and short-lived, so configuration is assembled from
//! built-in defaults overridden by `EID_AGENT_*` environment variables. The
//! module also owns the [`LogFormat`] type and the tracing bootstrap used by
//! the binary; logs always go to stderr because stdout carries the
//! native-messaging frames.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod defaults;
pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};

/// Environment variable prefix recognised by [`Config::from_env`].
pub const ENV_PREFIX: &str = "EID_AGENT_";

/// Runtime configuration for a single command session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// How long to wait for a smart card reader to appear, in milliseconds.
    reader_timeout_millis: u64,
    /// How long to wait for a card once a reader is attached, in milliseconds.
    card_timeout_millis: u64,
    /// Interval between reader polls, in milliseconds.
    poll_interval_millis: u64,
    /// Origins that are accepted without the https scheme.
    insecure_origins: Vec<String>,
    /// Log filter expression handed to the tracing subscriber.
    log_filter: String,
    /// Log output format.
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reader_timeout_millis: defaults::DEFAULT_READER_TIMEOUT_SECS * 1000,
            card_timeout_millis: defaults::DEFAULT_CARD_TIMEOUT_SECS * 1000,
            poll_interval_millis: defaults::DEFAULT_POLL_INTERVAL_MILLIS,
            insecure_origins: Vec::new(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// Builds the configuration from defaults and `EID_AGENT_*` environment
    /// variables.
    ///
    /// Recognised variables: `EID_AGENT_READER_TIMEOUT_SECS`,
    /// `EID_AGENT_CARD_TIMEOUT_SECS`, `EID_AGENT_POLL_INTERVAL_MILLIS`,
    /// `EID_AGENT_INSECURE_ORIGINS` (comma separated), `EID_AGENT_LOG_FILTER`
    /// and `EID_AGENT_LOG_FORMAT`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is present but
    /// cannot be parsed. Configuration failures are startup failures; the
    /// binary exits before reading any frame.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = read_env("READER_TIMEOUT_SECS") {
            config.reader_timeout_millis = parse_u64("READER_TIMEOUT_SECS", &value)? * 1000;
        }
        if let Some(value) = read_env("CARD_TIMEOUT_SECS") {
            config.card_timeout_millis = parse_u64("CARD_TIMEOUT_SECS", &value)? * 1000;
        }
        if let Some(value) = read_env("POLL_INTERVAL_MILLIS") {
            let millis = parse_u64("POLL_INTERVAL_MILLIS", &value)?;
            if millis == 0 {
                return Err(ConfigError::InvalidValue {
                    name: variable_name("POLL_INTERVAL_MILLIS"),
                    value,
                    reason: String::from("must be greater than zero"),
                });
            }
            config.poll_interval_millis = millis;
        }
        if let Some(value) = read_env("INSECURE_ORIGINS") {
            config.insecure_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(value) = read_env("LOG_FILTER") {
            config.log_filter = value;
        }
        if let Some(value) = read_env("LOG_FORMAT") {
            config.log_format =
                value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::InvalidValue {
                        name: variable_name("LOG_FORMAT"),
                        value,
                        reason: String::from("expected 'json' or 'compact'"),
                    })?;
        }

        Ok(config)
    }

    /// Timeout for the first reader to appear.
    #[must_use]
    pub const fn reader_timeout(&self) -> Duration {
        Duration::from_millis(self.reader_timeout_millis)
    }

    /// Timeout for a card to be inserted once a reader is attached.
    #[must_use]
    pub const fn card_timeout(&self) -> Duration {
        Duration::from_millis(self.card_timeout_millis)
    }

    /// Interval between reader polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    /// Origins exempt from the https requirement.
    #[must_use]
    pub fn insecure_origins(&self) -> &[String] {
        &self.insecure_origins
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Overrides both wait timeouts. Intended for tests that exercise the
    /// timeout paths without waiting out the defaults.
    pub fn set_timeouts(&mut self, reader: Duration, card: Duration) {
        self.reader_timeout_millis = duration_millis(reader);
        self.card_timeout_millis = duration_millis(card);
    }

    /// Overrides the reader poll interval.
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval_millis = duration_millis(interval).max(1);
    }

    /// Replaces the https-exempt origin list.
    pub fn set_insecure_origins(&mut self, origins: Vec<String>) {
        self.insecure_origins = origins;
    }
}

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was present but malformed.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        /// Full variable name, including the prefix.
        name: String,
        /// The offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

fn duration_millis(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

fn variable_name(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

fn read_env(suffix: &str) -> Option<String> {
    std::env::var(variable_name(suffix)).ok()
}

fn parse_u64(suffix: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|error| ConfigError::InvalidValue {
            name: variable_name(suffix),
            value: value.to_owned(),
            reason: error.to_string(),
        })
}
