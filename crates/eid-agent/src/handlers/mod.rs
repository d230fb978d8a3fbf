//! Command handlers for the card-backed commands.
//!
//! A handler is a capability over the fixed command set: it validates the
//! command's arguments semantically, names the key it works with, describes
//! the confirmation dialog, and runs the card operation on the worker. The
//! controller owns dialogs, waiting and retries; handlers stay pure card
//! work.

use serde_json::Value;
use thiserror::Error;
use url::Url;

use eid_card::{CancelFlag, CardCertificateStatus, CardError, KeyPurpose, PinInput};
use eid_config::Config;

mod authenticate;
mod certificate;
mod sign;

pub use authenticate::AuthenticateHandler;
pub use certificate::GetSigningCertificateHandler;
pub use sign::SignHandler;

/// Failures raised by handler validation and execution.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An argument failed semantic validation. No card I/O has happened.
    #[error("{0}")]
    InputData(String),

    /// An internal invariant was violated.
    #[error("{0}")]
    Programming(String),

    /// The card operation failed.
    #[error(transparent)]
    Card(#[from] CardError),
}

/// A validated web origin.
///
/// Origins must use https unless listed in the configuration's insecure
/// exceptions, and must not carry a path, query or fragment. The serialised
/// form (`scheme://host[:port]`) feeds both the confirmation dialog and the
/// authentication digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    serialisation: String,
    host: String,
}

impl Origin {
    /// Parses and validates an origin argument.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InputData`] naming the violated rule.
    pub fn parse(raw: &str, config: &Config) -> Result<Self, HandlerError> {
        let url = Url::parse(raw).map_err(|error| {
            HandlerError::InputData(format!("origin argument '{raw}' is not a valid URL: {error}"))
        })?;

        if url.query().is_some() || url.fragment().is_some() || !matches!(url.path(), "" | "/") {
            return Err(HandlerError::InputData(String::from(
                "origin argument must not contain a path, query or fragment",
            )));
        }

        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(HandlerError::InputData(format!(
                "origin argument '{raw}' is not a valid web origin"
            )));
        }
        let serialisation = origin.ascii_serialization();

        if url.scheme() != "https"
            && !config
                .insecure_origins()
                .iter()
                .any(|allowed| allowed == &serialisation)
        {
            return Err(HandlerError::InputData(String::from(
                "origin argument must use the https scheme",
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| {
                HandlerError::InputData(format!("origin argument '{raw}' has no host"))
            })?
            .to_owned();

        Ok(Self {
            serialisation,
            host,
        })
    }

    /// The serialised origin, `scheme://host[:port]`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.serialisation
    }

    /// The host component.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// The handler capability the controller drives.
pub trait CommandHandler: Send + Sync {
    /// Wire name of the command, for dialogs and logging.
    fn command_name(&self) -> &'static str;

    /// The card key the command works with.
    fn key_purpose(&self) -> KeyPurpose;

    /// Semantic argument validation. Must not touch the card.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InputData`] for malformed, missing or
    /// out-of-range arguments.
    fn validate(&mut self, config: &Config) -> Result<(), HandlerError>;

    /// The validated origin. Present once [`CommandHandler::validate`] has
    /// succeeded.
    fn origin(&self) -> Option<&Origin>;

    /// Whether the command needs PIN verification.
    fn requires_pin(&self) -> bool;

    /// Executes the card operation. Runs on the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Card`] for card failures and
    /// [`HandlerError::Programming`] when invoked out of order.
    fn run(
        &self,
        status: &CardCertificateStatus,
        pin: Option<PinInput>,
        cancel: &CancelFlag,
    ) -> Result<Value, HandlerError>;
}
