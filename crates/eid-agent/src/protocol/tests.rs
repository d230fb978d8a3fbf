//! Unit tests for envelope validation and response construction.

use rstest::rstest;
use serde_json::json;

use super::*;

#[test]
fn status_request_parses_without_arguments() {
    let envelope = parse(&json!({"id": "1", "command": "status"})).expect("valid envelope");
    assert_eq!(envelope.id(), Some(&json!("1")));
    assert_eq!(envelope.command(), &Command::Status { extension: None });
    assert_eq!(envelope.lang(), None);
}

#[test]
fn status_request_echoes_the_extension_version() {
    let envelope = parse(&json!({
        "command": "status",
        "arguments": {"extension": "2.5.0"}
    }))
    .expect("valid envelope");
    assert_eq!(
        envelope.command(),
        &Command::Status {
            extension: Some(String::from("2.5.0"))
        }
    );
}

#[test]
fn authenticate_request_parses_into_typed_arguments() {
    let envelope = parse(&json!({
        "command": "authenticate",
        "lang": "et",
        "arguments": {
            "challengeNonce": "12345678123456781234567812345678912356789123",
            "origin": "https://ria.ee"
        }
    }))
    .expect("valid envelope");

    assert_eq!(envelope.lang(), Some("et"));
    let Command::Authenticate(arguments) = envelope.command() else {
        panic!("expected an authenticate command");
    };
    assert_eq!(arguments.origin, "https://ria.ee");
    assert_eq!(arguments.challenge_nonce.len(), 44);
}

#[test]
fn sign_request_parses_into_typed_arguments() {
    let envelope = parse(&json!({
        "command": "sign",
        "arguments": {
            "origin": "https://ria.ee",
            "hash": "dGVzdA==",
            "hashFunction": "SHA-256"
        }
    }))
    .expect("valid envelope");

    let Command::Sign(arguments) = envelope.command() else {
        panic!("expected a sign command");
    };
    assert_eq!(arguments.hash_function, "SHA-256");
}

#[rstest]
#[case::not_an_object(json!([1, 2]), ParseError::NotAnObject)]
#[case::missing_command(json!({"id": "1"}), ParseError::MissingField { field: "command" })]
#[case::command_wrong_type(
    json!({"command": 7}),
    ParseError::WrongType { field: "command", expected: "string" }
)]
#[case::unknown_command(
    json!({"command": "reboot"}),
    ParseError::UnknownCommand { command: String::from("reboot") }
)]
#[case::arguments_wrong_type(
    json!({"command": "sign", "arguments": []}),
    ParseError::WrongType { field: "arguments", expected: "object" }
)]
#[case::missing_arguments(
    json!({"command": "authenticate"}),
    ParseError::MissingField { field: "arguments" }
)]
#[case::missing_nonce(
    json!({"command": "authenticate", "arguments": {"origin": "https://ria.ee"}}),
    ParseError::MissingField { field: "challengeNonce" }
)]
#[case::nonce_wrong_type(
    json!({"command": "authenticate", "arguments": {"challengeNonce": 5, "origin": "https://ria.ee"}}),
    ParseError::WrongType { field: "challengeNonce", expected: "string" }
)]
#[case::missing_hash_function(
    json!({"command": "sign", "arguments": {"origin": "https://ria.ee", "hash": "dGVzdA=="}}),
    ParseError::MissingField { field: "hashFunction" }
)]
#[case::lang_wrong_type(
    json!({"command": "status", "lang": 1}),
    ParseError::WrongType { field: "lang", expected: "string" }
)]
fn malformed_envelopes_are_rejected(#[case] request: serde_json::Value, #[case] expected: ParseError) {
    assert_eq!(parse(&request).expect_err("must be rejected"), expected);
}

#[test]
fn success_response_echoes_the_id_beside_the_payload() {
    let response = success_response(Some(&json!("42")), json!({"version": "1.0.0"}));
    assert_eq!(response, json!({"id": "42", "version": "1.0.0"}));
}

#[test]
fn success_response_omits_an_absent_id() {
    let response = success_response(None, json!({"version": "1.0.0"}));
    assert_eq!(response, json!({"version": "1.0.0"}));
}

#[test]
fn error_response_nests_code_and_message() {
    let response = error_response(Some(&json!("9")), "ERR_WEBEID_USER_CANCELLED", "cancelled");
    assert_eq!(
        response,
        json!({
            "id": "9",
            "error": {"code": "ERR_WEBEID_USER_CANCELLED", "message": "cancelled"}
        })
    );
}

#[test]
fn salvage_id_recovers_the_id_from_invalid_envelopes() {
    let request = json!({"id": 7, "command": 12});
    assert_eq!(salvage_id(&request), Some(&json!(7)));
    assert_eq!(salvage_id(&json!("not an object")), None);
}
