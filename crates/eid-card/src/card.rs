//! Card handles and the driver-facing signing interface.

use std::fmt;
use std::sync::Arc;

use crate::algorithm::{JwsAlgorithm, SignatureAlgorithm};
use crate::cancel::CancelFlag;
use crate::error::CardError;
use crate::pin::{PinInput, PinPolicy};
use crate::reader::ReaderInfo;

/// Which of the card's two keys an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// The authentication key.
    Authentication,
    /// The qualified signing key.
    Signing,
}

/// Operations a vendor card driver must provide.
///
/// Implementations wrap a connected card. All methods are blocking;
/// [`EidCard::sign`] must check the cancellation flag between APDU exchanges
/// and drain in-flight work before reporting [`CardError::Cancelled`].
pub trait EidCard: Send + Sync {
    /// Card model name shown in the card chooser, e.g. `EstEID 2018`.
    fn model(&self) -> &str;

    /// The JWS algorithm of the authentication key.
    fn auth_algorithm(&self) -> JwsAlgorithm;

    /// Signature algorithms the signing key supports.
    fn signing_algorithms(&self) -> Vec<SignatureAlgorithm>;

    /// Reads the DER certificate for the given key.
    ///
    /// # Errors
    ///
    /// Returns a [`CardError`] when the certificate file cannot be read.
    fn certificate(&self, purpose: KeyPurpose) -> Result<Vec<u8>, CardError>;

    /// Reads the PIN constraints and retry counter for the given key.
    ///
    /// # Errors
    ///
    /// Returns a [`CardError`] when the retry counter cannot be read or the
    /// declared constraints are unsupported.
    fn pin_policy(&self, purpose: KeyPurpose) -> Result<PinPolicy, CardError>;

    /// Verifies the PIN and signs a caller-supplied digest with the given
    /// key.
    ///
    /// The PIN buffer moves into the call; drivers wipe it before returning.
    /// Pad readers receive [`PinInput::PinPad`] and run PIN entry in
    /// hardware.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::WrongPin`] with the remaining attempt count on a
    /// failed verification, [`CardError::Cancelled`] when the flag is raised
    /// mid-operation, and other [`CardError`] values for communication
    /// failures.
    fn sign(
        &self,
        purpose: KeyPurpose,
        pin: PinInput,
        digest: &[u8],
        cancel: &CancelFlag,
    ) -> Result<Vec<u8>, CardError>;
}

/// A recognised card in a specific reader.
///
/// The handle is cheap to clone; ownership of a clone moves into the
/// run-worker for the duration of an operation. Invalidation on removal is
/// signalled through the cancellation flag, never through shared state.
#[derive(Clone)]
pub struct CardInfo {
    reader: ReaderInfo,
    eid: Arc<dyn EidCard>,
}

impl CardInfo {
    /// Pairs a reader with the driver handle opened for its card.
    #[must_use]
    pub fn new(reader: ReaderInfo, eid: Arc<dyn EidCard>) -> Self {
        Self { reader, eid }
    }

    /// The reader holding the card.
    #[must_use]
    pub const fn reader(&self) -> &ReaderInfo {
        &self.reader
    }

    /// The driver handle.
    #[must_use]
    pub fn eid(&self) -> &Arc<dyn EidCard> {
        &self.eid
    }
}

impl fmt::Debug for CardInfo {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CardInfo")
            .field("reader", &self.reader)
            .field("model", &self.eid.model())
            .finish()
    }
}
