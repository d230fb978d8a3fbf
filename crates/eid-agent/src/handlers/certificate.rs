//! The `get-signing-certificate` command handler.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use eid_card::{CancelFlag, CardCertificateStatus, KeyPurpose, PinInput};
use eid_config::Config;

use crate::protocol::CertificateArgs;

use super::{CommandHandler, HandlerError, Origin};

/// Returns the signing certificate and the algorithms the signing key
/// supports. No PIN and no signature are involved.
#[derive(Debug)]
pub struct GetSigningCertificateHandler {
    arguments: CertificateArgs,
    origin: Option<Origin>,
}

impl GetSigningCertificateHandler {
    /// Wraps the parsed arguments.
    #[must_use]
    pub fn new(arguments: CertificateArgs) -> Self {
        Self {
            arguments,
            origin: None,
        }
    }
}

impl CommandHandler for GetSigningCertificateHandler {
    fn command_name(&self) -> &'static str {
        "get-signing-certificate"
    }

    fn key_purpose(&self) -> KeyPurpose {
        KeyPurpose::Signing
    }

    fn validate(&mut self, config: &Config) -> Result<(), HandlerError> {
        self.origin = Some(Origin::parse(&self.arguments.origin, config)?);
        Ok(())
    }

    fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    fn requires_pin(&self) -> bool {
        false
    }

    fn run(
        &self,
        status: &CardCertificateStatus,
        pin: Option<PinInput>,
        _cancel: &CancelFlag,
    ) -> Result<Value, HandlerError> {
        if pin.is_some() {
            return Err(HandlerError::Programming(String::from(
                "get-signing-certificate executed with a PIN input",
            )));
        }

        let algorithms = status.card().eid().signing_algorithms();
        Ok(json!({
            "certificate": STANDARD.encode(status.certificate().der()),
            "supportedSignatureAlgorithms": algorithms,
        }))
    }
}
