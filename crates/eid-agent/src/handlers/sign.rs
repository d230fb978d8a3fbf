//! The `sign` command handler.
//!
//! The caller supplies the document digest; the handler never re-hashes.
//! The digest length must match the declared hash function before any card
//! I/O happens.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use eid_card::{CancelFlag, CardCertificateStatus, HashFunction, KeyPurpose, PinInput};
use eid_config::Config;

use crate::protocol::SignArgs;

use super::{CommandHandler, HandlerError, Origin};

/// Signs a caller-supplied digest with the signing key.
#[derive(Debug)]
pub struct SignHandler {
    arguments: SignArgs,
    origin: Option<Origin>,
    hash_function: Option<HashFunction>,
    digest: Vec<u8>,
}

impl SignHandler {
    /// Wraps the parsed arguments.
    #[must_use]
    pub fn new(arguments: SignArgs) -> Self {
        Self {
            arguments,
            origin: None,
            hash_function: None,
            digest: Vec::new(),
        }
    }
}

impl CommandHandler for SignHandler {
    fn command_name(&self) -> &'static str {
        "sign"
    }

    fn key_purpose(&self) -> KeyPurpose {
        KeyPurpose::Signing
    }

    fn validate(&mut self, config: &Config) -> Result<(), HandlerError> {
        self.origin = Some(Origin::parse(&self.arguments.origin, config)?);

        let hash_function =
            HashFunction::from_name(&self.arguments.hash_function).ok_or_else(|| {
                HandlerError::InputData(format!(
                    "Hash function argument 'hashFunction' '{}' is not supported",
                    self.arguments.hash_function
                ))
            })?;

        let digest = STANDARD.decode(&self.arguments.hash).map_err(|error| {
            HandlerError::InputData(format!(
                "Hash argument 'hash' is not valid base64: {error}"
            ))
        })?;
        if digest.len() != hash_function.digest_length() {
            return Err(HandlerError::InputData(format!(
                "Hash argument 'hash' is {} bytes, but {} digests are {} bytes",
                digest.len(),
                hash_function.name(),
                hash_function.digest_length()
            )));
        }

        self.hash_function = Some(hash_function);
        self.digest = digest;
        Ok(())
    }

    fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    fn requires_pin(&self) -> bool {
        true
    }

    fn run(
        &self,
        status: &CardCertificateStatus,
        pin: Option<PinInput>,
        cancel: &CancelFlag,
    ) -> Result<Value, HandlerError> {
        let hash_function = self.hash_function.ok_or_else(|| {
            HandlerError::Programming(String::from("sign executed before validation"))
        })?;
        let pin = pin.ok_or_else(|| {
            HandlerError::Programming(String::from("sign executed without a PIN input"))
        })?;

        let eid = status.card().eid();
        let algorithm = eid
            .signing_algorithms()
            .into_iter()
            .find(|algorithm| algorithm.hash == hash_function)
            .ok_or_else(|| {
                HandlerError::InputData(format!(
                    "the card does not support signing {} digests",
                    hash_function.name()
                ))
            })?;

        let signature = eid.sign(KeyPurpose::Signing, pin, &self.digest, cancel)?;

        Ok(json!({
            "signature": STANDARD.encode(signature),
            "signatureAlgorithm": algorithm,
        }))
    }
}
