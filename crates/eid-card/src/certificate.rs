//! Certificate access and subject parsing.
//!
//! The confirmation dialog shows who is about to authenticate or sign, so
//! the facade parses the DER certificate far enough to extract the subject.
//! National eID certificates encode the holder as
//! `SURNAME,GIVEN-NAMES,PERSONAL-CODE` in the common name; the display name
//! reorders that to `GIVEN-NAMES SURNAME`.

use x509_certificate::X509Certificate;

use crate::card::{CardInfo, KeyPurpose};
use crate::error::CardError;
use crate::pin::PinPolicy;

/// A parsed certificate together with its raw DER bytes.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    der: Vec<u8>,
    common_name: Option<String>,
}

impl CertificateInfo {
    /// Parses a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::UnknownCard`] when the bytes are not a valid
    /// certificate; a card whose certificate cannot be read is not usable as
    /// an eID card.
    pub fn parse(der: Vec<u8>) -> Result<Self, CardError> {
        let certificate =
            X509Certificate::from_der(&der).map_err(|_| CardError::UnknownCard)?;
        let common_name = certificate.subject_common_name();
        Ok(Self { der, common_name })
    }

    /// The raw DER bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The subject common name as encoded in the certificate.
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Human-readable holder name for dialogs.
    ///
    /// `SURNAME,GIVEN,CODE` common names become `GIVEN SURNAME`; anything
    /// else is shown verbatim.
    #[must_use]
    pub fn display_name(&self) -> String {
        let Some(common_name) = self.common_name.as_deref() else {
            return String::from("eID card holder");
        };
        let mut parts = common_name.split(',');
        match (parts.next(), parts.next()) {
            (Some(surname), Some(given)) if !given.is_empty() => {
                format!("{given} {surname}")
            }
            _ => common_name.to_owned(),
        }
    }
}

/// Everything the confirmation and PIN steps need about the selected card.
#[derive(Debug, Clone)]
pub struct CardCertificateStatus {
    card: CardInfo,
    certificate: CertificateInfo,
    pin: PinPolicy,
}

impl CardCertificateStatus {
    /// The selected card.
    #[must_use]
    pub const fn card(&self) -> &CardInfo {
        &self.card
    }

    /// The certificate for the requested key.
    #[must_use]
    pub const fn certificate(&self) -> &CertificateInfo {
        &self.certificate
    }

    /// PIN constraints and retry counter for the requested key.
    #[must_use]
    pub const fn pin(&self) -> &PinPolicy {
        &self.pin
    }
}

/// Reads the certificate and PIN policy for one of the card's keys.
///
/// # Errors
///
/// Propagates driver errors and rejects unparseable certificates as
/// [`CardError::UnknownCard`].
pub fn read_certificate_status(
    card: &CardInfo,
    purpose: KeyPurpose,
) -> Result<CardCertificateStatus, CardError> {
    let der = card.eid().certificate(purpose)?;
    let certificate = CertificateInfo::parse(der)?;
    let pin = card.eid().pin_policy(purpose)?;
    Ok(CardCertificateStatus {
        card: card.clone(),
        certificate,
        pin,
    })
}
