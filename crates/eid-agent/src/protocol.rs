//! Request envelope validation and response construction.
//!
//! The parser checks the envelope shape and the presence and primitive type
//! of per-command arguments, producing a typed [`Command`]. Semantic checks
//! (nonce length, URL scheme, digest length) belong to the command handlers
//! so their failures surface as invalid-argument errors with the handler's
//! diagnostics.

use serde_json::{Map, Value};
use thiserror::Error;

/// A validated request envelope.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    id: Option<Value>,
    command: Command,
    lang: Option<String>,
}

impl RequestEnvelope {
    /// The opaque correlation token, echoed on the response.
    #[must_use]
    pub const fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// The typed command.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// The requested UI language, when provided.
    #[must_use]
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }
}

/// The recognised command set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report application version information.
    Status {
        /// Extension version echoed back when the caller supplied one.
        extension: Option<String>,
    },
    /// Acknowledge and exit.
    Quit,
    /// Produce an authentication token over an origin and challenge nonce.
    Authenticate(AuthenticateArgs),
    /// Return the signing certificate and supported algorithms.
    GetSigningCertificate(CertificateArgs),
    /// Sign a caller-supplied digest.
    Sign(SignArgs),
}

/// Arguments of the `authenticate` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateArgs {
    /// Server-issued anti-replay value.
    pub challenge_nonce: String,
    /// Origin URL of the requesting web application.
    pub origin: String,
}

/// Arguments of the `get-signing-certificate` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateArgs {
    /// Origin URL of the requesting web application.
    pub origin: String,
}

/// Arguments of the `sign` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignArgs {
    /// Origin URL of the requesting web application.
    pub origin: String,
    /// Base64-encoded digest to sign.
    pub hash: String,
    /// Digest function name, e.g. `SHA-256`.
    pub hash_function: String,
}

/// Envelope-level validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The request is not a JSON object.
    #[error("request must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("required field '{field}' is missing")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field is present with the wrong primitive type.
    #[error("field '{field}' must be a {expected}")]
    WrongType {
        /// Name of the offending field.
        field: &'static str,
        /// Expected primitive type.
        expected: &'static str,
    },

    /// The command name is not part of the recognised set.
    #[error("unrecognised command '{command}'")]
    UnknownCommand {
        /// The command name from the request.
        command: String,
    },
}

/// Validates a raw request value into an envelope.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the offending field.
pub fn parse(request: &Value) -> Result<RequestEnvelope, ParseError> {
    let object = request.as_object().ok_or(ParseError::NotAnObject)?;

    let command_name = require_string(object, "command")?;
    let lang = optional_string(object, "lang")?;
    let id = object.get("id").cloned();
    let arguments = optional_object(object, "arguments")?;

    let command = match command_name {
        "status" => Command::Status {
            extension: arguments
                .map(|arguments| optional_string(arguments, "extension"))
                .transpose()?
                .flatten()
                .map(str::to_owned),
        },
        "quit" => Command::Quit,
        "authenticate" => {
            let arguments = require_arguments(arguments)?;
            Command::Authenticate(AuthenticateArgs {
                challenge_nonce: require_string(arguments, "challengeNonce")?.to_owned(),
                origin: require_string(arguments, "origin")?.to_owned(),
            })
        }
        "get-signing-certificate" => {
            let arguments = require_arguments(arguments)?;
            Command::GetSigningCertificate(CertificateArgs {
                origin: require_string(arguments, "origin")?.to_owned(),
            })
        }
        "sign" => {
            let arguments = require_arguments(arguments)?;
            Command::Sign(SignArgs {
                origin: require_string(arguments, "origin")?.to_owned(),
                hash: require_string(arguments, "hash")?.to_owned(),
                hash_function: require_string(arguments, "hashFunction")?.to_owned(),
            })
        }
        other => {
            return Err(ParseError::UnknownCommand {
                command: other.to_owned(),
            })
        }
    };

    Ok(RequestEnvelope {
        id,
        command,
        lang: lang.map(str::to_owned),
    })
}

/// Builds a success response carrying the payload fields beside the echoed
/// request id.
#[must_use]
pub fn success_response(id: Option<&Value>, payload: Value) -> Value {
    let mut response = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert(String::from("result"), other);
            map
        }
    };
    if let Some(id) = id {
        response.insert(String::from("id"), id.clone());
    }
    Value::Object(response)
}

/// Builds an error response with the given code and message.
#[must_use]
pub fn error_response(id: Option<&Value>, code: &str, message: &str) -> Value {
    let mut response = Map::new();
    if let Some(id) = id {
        response.insert(String::from("id"), id.clone());
    }
    response.insert(
        String::from("error"),
        serde_json::json!({ "code": code, "message": message }),
    );
    Value::Object(response)
}

/// Extracts the correlation id from a request that failed envelope
/// validation, so the error response can still echo it.
#[must_use]
pub fn salvage_id(request: &Value) -> Option<&Value> {
    request.as_object().and_then(|object| object.get("id"))
}

fn require_arguments(
    arguments: Option<&Map<String, Value>>,
) -> Result<&Map<String, Value>, ParseError> {
    arguments.ok_or(ParseError::MissingField { field: "arguments" })
}

fn require_string<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ParseError> {
    match object.get(field) {
        None => Err(ParseError::MissingField { field }),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ParseError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn optional_string<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, ParseError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(ParseError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn optional_object<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a Map<String, Value>>, ParseError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(value)) => Ok(Some(value)),
        Some(_) => Err(ParseError::WrongType {
            field,
            expected: "object",
        }),
    }
}

#[cfg(test)]
mod tests;
