//! The `authenticate` command handler.

use serde_json::Value;

use eid_card::{CancelFlag, CardCertificateStatus, KeyPurpose, PinInput};
use eid_config::Config;

use crate::protocol::AuthenticateArgs;
use crate::token::AuthenticationToken;

use super::{CommandHandler, HandlerError, Origin};

/// Shortest accepted challenge nonce: 32 base64-encoded bytes, the minimum
/// entropy the validation libraries require.
const MIN_NONCE_LENGTH: usize = 44;

/// Longest accepted challenge nonce.
const MAX_NONCE_LENGTH: usize = 128;

/// Produces the authentication token over the origin and challenge nonce.
#[derive(Debug)]
pub struct AuthenticateHandler {
    arguments: AuthenticateArgs,
    origin: Option<Origin>,
}

impl AuthenticateHandler {
    /// Wraps the parsed arguments; validation happens in
    /// [`CommandHandler::validate`].
    #[must_use]
    pub fn new(arguments: AuthenticateArgs) -> Self {
        Self {
            arguments,
            origin: None,
        }
    }
}

impl CommandHandler for AuthenticateHandler {
    fn command_name(&self) -> &'static str {
        "authenticate"
    }

    fn key_purpose(&self) -> KeyPurpose {
        KeyPurpose::Authentication
    }

    fn validate(&mut self, config: &Config) -> Result<(), HandlerError> {
        let nonce_length = self.arguments.challenge_nonce.len();
        if nonce_length < MIN_NONCE_LENGTH {
            return Err(HandlerError::InputData(format!(
                "Challenge nonce argument 'challengeNonce' must be at least {MIN_NONCE_LENGTH} characters long"
            )));
        }
        if nonce_length > MAX_NONCE_LENGTH {
            return Err(HandlerError::InputData(format!(
                "Challenge nonce argument 'challengeNonce' cannot be longer than {MAX_NONCE_LENGTH} characters"
            )));
        }
        self.origin = Some(Origin::parse(&self.arguments.origin, config)?);
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
        let origin = self.origin.as_ref().ok_or_else(|| {
            HandlerError::Programming(String::from("authenticate executed before validation"))
        })?;
        let pin = pin.ok_or_else(|| {
            HandlerError::Programming(String::from("authenticate executed without a PIN input"))
        })?;

        let eid = status.card().eid();
        let algorithm = eid.auth_algorithm();
        let hash = algorithm.hash_function();

        // The signed value is hash(hash(origin) + hash(nonce)); hashing the
        // parts separately before concatenation keeps the two fields
        // unambiguously separated in the pre-image.
        let origin_hash = hash.digest(origin.as_str().as_bytes());
        let nonce_hash = hash.digest(self.arguments.challenge_nonce.as_bytes());
        let mut pre_image = origin_hash;
        pre_image.extend_from_slice(&nonce_hash);
        let digest = hash.digest(&pre_image);

        let signature = eid.sign(KeyPurpose::Authentication, pin, &digest, cancel)?;

        let token =
            AuthenticationToken::new(algorithm, status.certificate().der(), &signature);
        serde_json::to_value(token).map_err(|error| {
            HandlerError::Programming(format!("failed to serialise the token: {error}"))
        })
    }
}
