//! Authentication token construction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use eid_card::JwsAlgorithm;

/// Token format tag understood by the validation libraries.
pub const TOKEN_FORMAT: &str = "web-eid:1.0";

/// Application version string reported in tokens and status responses.
#[must_use]
pub fn app_version() -> String {
    format!(
        "https://web-eid.eu/web-eid-app/releases/{}",
        env!("CARGO_PKG_VERSION")
    )
}

/// The authentication proof returned by the `authenticate` command.
///
/// The certificate is deliberately labelled unverified: the agent proves
/// possession of the key, while certificate validation is the relying
/// party's job.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationToken {
    unverified_certificate: String,
    algorithm: String,
    signature: String,
    format: String,
    app_version: String,
}

impl AuthenticationToken {
    /// Assembles a token from the raw certificate and signature bytes.
    #[must_use]
    pub fn new(algorithm: JwsAlgorithm, certificate_der: &[u8], signature: &[u8]) -> Self {
        Self {
            unverified_certificate: STANDARD.encode(certificate_der),
            algorithm: algorithm.to_string(),
            signature: STANDARD.encode(signature),
            format: String::from(TOKEN_FORMAT),
            app_version: app_version(),
        }
    }
}
