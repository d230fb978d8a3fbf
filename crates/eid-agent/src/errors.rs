//! Command error taxonomy and wire error codes.
//!
//! Two families: [`RetriableError`] values are rendered by the UI with a
//! retry affordance and never reach the wire on their own; [`CommandError`]
//! values are terminal and become the `error` object of the response frame.
//! The controller owns the translation between card-facade failures and
//! these families.

use thiserror::Error;

use eid_card::CardError;

/// Wire error codes, as understood by the browser extension.
pub mod code {
    /// Malformed, missing or out-of-range argument.
    pub const INVALID_ARGUMENT: &str = "ERR_WEBEID_NATIVE_INVALID_ARGUMENT";
    /// Internal invariant violation.
    pub const NATIVE_FATAL: &str = "ERR_WEBEID_NATIVE_FATAL";
    /// No reader appeared within the timeout.
    pub const NO_READERS: &str = "ERR_WEBEID_NO_SMART_CARD_READERS";
    /// No recognised card appeared within the timeout.
    pub const NO_CARD: &str = "ERR_WEBEID_NO_SMART_CARD";
    /// The user declined or dismissed a dialog.
    pub const USER_CANCELLED: &str = "ERR_WEBEID_USER_CANCELLED";
    /// The PIN retry counter is exhausted.
    pub const PIN_BLOCKED: &str = "ERR_WEBEID_PIN_BLOCKED";
    /// APDU exchange or reader communication failed.
    pub const CARD_COMMUNICATION_FAILURE: &str = "ERR_WEBEID_CARD_COMMUNICATION_FAILURE";
    /// The platform smart card service is not available.
    pub const SERVICE_UNAVAILABLE: &str = "ERR_WEBEID_SMART_CARD_SERVICE_UNAVAILABLE";
    /// An operation timed out outside the reader and card waits.
    pub const ACTION_TIMEOUT: &str = "ERR_WEBEID_ACTION_TIMEOUT";
}

/// User-recoverable conditions. The UI renders these with a retry
/// affordance; declining converts them to a terminal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetriableError {
    /// No smart card readers are attached.
    NoReader,
    /// Readers are attached but hold no recognised card.
    NoCard,
    /// The inserted card is not a recognised eID card.
    UnknownCard,
    /// The card was removed mid-operation.
    CardRemoved,
    /// The card refuses PIN verification.
    PinVerifyDisabled,
    /// The card rejected the PIN.
    WrongPin {
        /// Remaining attempts before the PIN blocks.
        retries_left: u8,
    },
    /// PIN entry on the reader pad timed out.
    PinTimeout,
}

impl std::fmt::Display for RetriableError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoReader => formatter.write_str("Connect a smart card reader."),
            Self::NoCard => formatter.write_str("Insert your eID card into the reader."),
            Self::UnknownCard => {
                formatter.write_str("The inserted card is not a supported eID card.")
            }
            Self::CardRemoved => formatter.write_str("The card was removed."),
            Self::PinVerifyDisabled => {
                formatter.write_str("PIN verification is disabled on the card.")
            }
            Self::WrongPin { retries_left } => {
                write!(formatter, "Wrong PIN, {retries_left} attempts left.")
            }
            Self::PinTimeout => formatter.write_str("PIN entry timed out."),
        }
    }
}

impl RetriableError {
    /// Classifies a card failure as retriable, when it is.
    ///
    /// `WrongPin` with an exhausted counter is not retriable; the caller
    /// promotes it to [`CommandError::PinBlocked`].
    #[must_use]
    pub fn from_card(error: &CardError) -> Option<Self> {
        match error {
            CardError::NoReader => Some(Self::NoReader),
            CardError::NoCard => Some(Self::NoCard),
            CardError::UnknownCard => Some(Self::UnknownCard),
            CardError::CardRemoved => Some(Self::CardRemoved),
            CardError::PinVerifyDisabled => Some(Self::PinVerifyDisabled),
            CardError::WrongPin { retries_left } if *retries_left > 0 => Some(Self::WrongPin {
                retries_left: *retries_left,
            }),
            CardError::PinTimeout => Some(Self::PinTimeout),
            _ => None,
        }
    }
}

/// Terminal command failures, written to the wire as `{code, message}`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// An argument failed semantic validation.
    #[error("{0}")]
    InvalidArgument(String),

    /// An internal invariant was violated.
    #[error("{0}")]
    Fatal(String),

    /// No reader appeared within the timeout.
    #[error("no smart card readers attached")]
    NoReaders,

    /// No recognised card appeared within the timeout.
    #[error("no eID card found within the timeout")]
    NoCard,

    /// The user declined or dismissed a dialog.
    #[error("the user cancelled the operation")]
    UserCancelled,

    /// The PIN retry counter is exhausted.
    #[error("the PIN is blocked")]
    PinBlocked,

    /// An operation timed out outside the reader and card waits.
    #[error("the operation timed out")]
    Timeout,

    /// APDU exchange or reader communication failed.
    #[error("smart card communication failure: {0}")]
    CardCommunication(String),

    /// The platform smart card service is not available.
    #[error("smart card service is unavailable: {0}")]
    ServiceUnavailable(String),
}

impl CommandError {
    /// The wire error code for this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => code::INVALID_ARGUMENT,
            Self::Fatal(_) => code::NATIVE_FATAL,
            Self::NoReaders => code::NO_READERS,
            Self::NoCard => code::NO_CARD,
            Self::UserCancelled => code::USER_CANCELLED,
            Self::PinBlocked => code::PIN_BLOCKED,
            Self::Timeout => code::ACTION_TIMEOUT,
            Self::CardCommunication(_) => code::CARD_COMMUNICATION_FAILURE,
            Self::ServiceUnavailable(_) => code::SERVICE_UNAVAILABLE,
        }
    }

    /// Terminal translation of a card failure.
    ///
    /// Retriable conditions reach this point only when the user declined the
    /// retry affordance, so they fold into cancellation or their blocking
    /// outcome.
    #[must_use]
    pub fn from_card(error: CardError) -> Self {
        match error {
            CardError::NoReader => Self::NoReaders,
            CardError::NoCard | CardError::CardRemoved | CardError::UnknownCard => Self::NoCard,
            CardError::Cancelled => Self::UserCancelled,
            CardError::PinBlocked | CardError::WrongPin { retries_left: 0 } => Self::PinBlocked,
            CardError::WrongPin { .. } | CardError::PinVerifyDisabled => Self::UserCancelled,
            CardError::PinTimeout => Self::Timeout,
            CardError::UnsupportedPinLength { max_length } => Self::Fatal(format!(
                "card declares unsupported maximum PIN length {max_length}"
            )),
            CardError::Communication(message) => Self::CardCommunication(message),
            CardError::ServiceUnavailable(message) => Self::ServiceUnavailable(message),
        }
    }
}
