//! Built-in defaults shared by the binary and tests.

use crate::logging::LogFormat;

/// Default wait for a smart card reader to appear, in seconds.
pub const DEFAULT_READER_TIMEOUT_SECS: u64 = 30;

/// Default wait for a card once a reader is attached, in seconds.
pub const DEFAULT_CARD_TIMEOUT_SECS: u64 = 30;

/// Default interval between reader polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 500;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
