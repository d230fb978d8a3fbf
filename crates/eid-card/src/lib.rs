//! Smart card subsystem facade for the eID agent.
//!
//! The crate sits between the command controller and the platform PC/SC
//! stack. It enumerates readers, selects candidate eID cards, reads
//! certificates and PIN policy, exposes the signing primitives, and monitors
//! reader changes. Vendor-specific APDU drivers plug in through the
//! [`pcsc_backend::CardDriver`] seam; everything in this crate is driver
//! agnostic.
//!
//! All operations are blocking. Cancellation is cooperative: long-running
//! calls take a [`CancelFlag`] and check it between APDU exchanges.

pub mod algorithm;
pub mod cancel;
pub mod card;
pub mod certificate;
pub mod error;
pub mod monitor;
pub mod pcsc_backend;
pub mod pin;
pub mod reader;

#[cfg(test)]
pub(crate) mod test_support;

pub use algorithm::{CryptoAlgorithm, HashFunction, JwsAlgorithm, PaddingScheme, SignatureAlgorithm};
pub use cancel::CancelFlag;
pub use card::{CardInfo, EidCard, KeyPurpose};
pub use certificate::{read_certificate_status, CardCertificateStatus, CertificateInfo};
pub use error::CardError;
pub use monitor::{ReaderChange, ReaderMonitor};
pub use pcsc_backend::{CardDriver, PcscService};
pub use pin::{PinBuffer, PinInput, PinPolicy, APDU_OVERHEAD, MAX_PIN_LENGTH, MAX_PIN_PADDING};
pub use reader::{CardService, CardTerminal, ReaderInfo};
