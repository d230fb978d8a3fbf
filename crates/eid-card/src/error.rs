//! Domain errors raised by card operations.
//!
//! All errors use `thiserror`-derived enums so the controller can inspect the
//! failure programmatically and decide between a retry affordance and a
//! terminal response.

use thiserror::Error;

/// Errors arising from reader and card operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CardError {
    /// No smart card readers are attached.
    #[error("no smart card readers attached")]
    NoReader,

    /// Readers are attached but none holds a supported card.
    #[error("no eID card found in any attached reader")]
    NoCard,

    /// A card is present but no registered driver recognises it.
    #[error("the inserted card is not a recognised eID card")]
    UnknownCard,

    /// The card was removed while an operation was in flight.
    #[error("the card was removed during the operation")]
    CardRemoved,

    /// The card refuses PIN verification (for example, PIN change pending).
    #[error("PIN verification is disabled on the card")]
    PinVerifyDisabled,

    /// The card rejected the PIN.
    #[error("wrong PIN, {retries_left} attempts left")]
    WrongPin {
        /// Remaining attempts before the PIN is blocked.
        retries_left: u8,
    },

    /// PIN entry on a pad reader timed out.
    #[error("PIN entry timed out on the reader")]
    PinTimeout,

    /// The PIN retry counter is exhausted.
    #[error("the PIN is blocked")]
    PinBlocked,

    /// The cooperative cancellation flag was raised.
    #[error("the operation was cancelled")]
    Cancelled,

    /// A driver declared a PIN length the fixed buffer cannot hold.
    #[error("card declares unsupported maximum PIN length {max_length}")]
    UnsupportedPinLength {
        /// Maximum PIN length declared by the driver.
        max_length: u8,
    },

    /// APDU exchange or reader communication failed.
    #[error("smart card communication failure: {0}")]
    Communication(String),

    /// The PC/SC service is not running or went away.
    #[error("smart card service is unavailable: {0}")]
    ServiceUnavailable(String),
}
