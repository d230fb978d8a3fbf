//! Signature and digest algorithm descriptors.
//!
//! Cards declare their key capabilities as JSON Web Signature algorithm
//! names; the agent derives the digest function for the authentication value
//! and the `{crypto, padding, hash}` descriptor reported on the wire from
//! them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use strum::{Display, EnumString};

/// JSON Web Signature algorithm names supported by eID cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum JwsAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[strum(serialize = "RS256")]
    #[serde(rename = "RS256")]
    Rs256,
    /// RSASSA-PSS with SHA-256.
    #[strum(serialize = "PS256")]
    #[serde(rename = "PS256")]
    Ps256,
    /// ECDSA over P-256 with SHA-256.
    #[strum(serialize = "ES256")]
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA over P-384 with SHA-384.
    #[strum(serialize = "ES384")]
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA over P-521 with SHA-512.
    #[strum(serialize = "ES512")]
    #[serde(rename = "ES512")]
    Es512,
}

impl JwsAlgorithm {
    /// The digest function the algorithm signs over.
    #[must_use]
    pub const fn hash_function(self) -> HashFunction {
        match self {
            Self::Rs256 | Self::Ps256 | Self::Es256 => HashFunction::Sha256,
            Self::Es384 => HashFunction::Sha384,
            Self::Es512 => HashFunction::Sha512,
        }
    }

    /// The wire descriptor for a signature made under this algorithm.
    #[must_use]
    pub const fn signature_algorithm(self) -> SignatureAlgorithm {
        match self {
            Self::Rs256 => SignatureAlgorithm {
                crypto: CryptoAlgorithm::Rsa,
                padding: PaddingScheme::Pkcs115,
                hash: HashFunction::Sha256,
            },
            Self::Ps256 => SignatureAlgorithm {
                crypto: CryptoAlgorithm::Rsa,
                padding: PaddingScheme::Pss,
                hash: HashFunction::Sha256,
            },
            Self::Es256 => SignatureAlgorithm {
                crypto: CryptoAlgorithm::Ecc,
                padding: PaddingScheme::None,
                hash: HashFunction::Sha256,
            },
            Self::Es384 => SignatureAlgorithm {
                crypto: CryptoAlgorithm::Ecc,
                padding: PaddingScheme::None,
                hash: HashFunction::Sha384,
            },
            Self::Es512 => SignatureAlgorithm {
                crypto: CryptoAlgorithm::Ecc,
                padding: PaddingScheme::None,
                hash: HashFunction::Sha512,
            },
        }
    }
}

/// Digest functions recognised on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashFunction {
    /// SHA-256, 32-byte digest.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// SHA-384, 48-byte digest.
    #[serde(rename = "SHA-384")]
    Sha384,
    /// SHA-512, 64-byte digest.
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashFunction {
    /// Parses the wire name, e.g. `SHA-256`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SHA-256" => Some(Self::Sha256),
            "SHA-384" => Some(Self::Sha384),
            "SHA-512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// The wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub const fn digest_length(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Computes the digest of `data`.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Public key algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptoAlgorithm {
    /// RSA keys.
    #[serde(rename = "RSA")]
    Rsa,
    /// Elliptic curve keys.
    #[serde(rename = "ECC")]
    Ecc,
}

/// RSA padding scheme, `NONE` for ECC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddingScheme {
    /// RSASSA-PKCS1-v1_5.
    #[serde(rename = "PKCS1.5")]
    Pkcs115,
    /// RSASSA-PSS.
    #[serde(rename = "PSS")]
    Pss,
    /// No padding (ECDSA).
    #[serde(rename = "NONE")]
    None,
}

/// Wire descriptor of a signature: key family, padding and digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAlgorithm {
    /// Public key algorithm family.
    pub crypto: CryptoAlgorithm,
    /// Padding scheme.
    pub padding: PaddingScheme,
    /// Digest function.
    pub hash: HashFunction,
}
