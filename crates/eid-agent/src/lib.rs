//! Native messaging helper for eID smart cards.
//!
//! The library owns the whole command session: argument parsing,
//! configuration bootstrapping, frame I/O on the provided streams, envelope
//! validation, and the command controller. The interface is designed to be
//! exercised both from the binary entrypoint and from tests where the
//! streams, the card service and the dialog surface are substituted.
//!
//! One process serves one command session: exactly one request frame is
//! read, exactly one response frame is written, and the process exits.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, warn};

use eid_card::{CardService, PcscService};
use eid_config::{init_logging, Config};

pub mod cli;
pub mod controller;
pub mod drivers;
pub mod errors;
pub mod framing;
pub mod handlers;
pub mod protocol;
pub mod token;
pub mod ui;

pub use controller::{Controller, ServiceSource};
pub use errors::CommandError;

use framing::FramedEndpoint;
use ui::ConsoleUi;

/// Tracing target for session-level events.
const AGENT_TARGET: &str = "eid_agent";

/// Exit code for startup failures: bad arguments or bad configuration.
pub const EXIT_STARTUP_FAILURE: u8 = 1;

/// Exit code for wire-format failures after startup.
pub const EXIT_FRAMING_FAILURE: u8 = 2;

/// Runs one command session over the given streams and returns the process
/// exit code.
#[must_use]
pub fn run<I, R, W>(args: I, input: &mut R, output: &mut W) -> u8
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            drop(error.print());
            return EXIT_STARTUP_FAILURE;
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return EXIT_STARTUP_FAILURE;
        }
    };

    // A second subscriber cannot be installed when the host process embeds
    // the session, so this is a warning rather than a startup failure.
    if let Err(logging_error) = init_logging(&config) {
        eprintln!("{logging_error}");
    }
    debug!(
        target: AGENT_TARGET,
        browser = cli.browser.as_deref().unwrap_or("unknown"),
        "session started"
    );

    let source: ServiceSource = Box::new(|| {
        PcscService::new(drivers::registry())
            .map(|service| Arc::new(service) as Arc<dyn CardService>)
    });
    let mut ui = ConsoleUi::new();
    run_session(&config, source, &mut ui, input, output)
}

/// Runs one command session with injected collaborators. The entrypoint
/// wires in the PC/SC service and the console surface; tests substitute
/// doubles.
#[must_use]
pub fn run_session<R, W>(
    config: &Config,
    source: ServiceSource,
    ui: &mut dyn ui::UiSurface,
    input: &mut R,
    output: &mut W,
) -> u8
where
    R: Read,
    W: Write,
{
    let mut endpoint = FramedEndpoint::new(input, output);

    let request = match endpoint.read_request() {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!(target: AGENT_TARGET, "input stream closed before a request");
            return 0;
        }
        Err(framing_error) => {
            error!(target: AGENT_TARGET, %framing_error, "unreadable request frame");
            let response = protocol::error_response(
                None,
                errors::code::NATIVE_FATAL,
                &framing_error.to_string(),
            );
            drop(endpoint.write_response(&response));
            return EXIT_FRAMING_FAILURE;
        }
    };

    let envelope = match protocol::parse(&request) {
        Ok(envelope) => envelope,
        Err(parse_error) => {
            warn!(target: AGENT_TARGET, %parse_error, "invalid request envelope");
            let response = protocol::error_response(
                protocol::salvage_id(&request),
                errors::code::INVALID_ARGUMENT,
                &parse_error.to_string(),
            );
            return match endpoint.write_response(&response) {
                Ok(()) => 0,
                Err(_) => EXIT_FRAMING_FAILURE,
            };
        }
    };

    let mut controller = Controller::new(config, source, ui);
    let response = match controller.execute(&envelope) {
        Ok(payload) => protocol::success_response(envelope.id(), payload),
        Err(command_error) => {
            warn!(
                target: AGENT_TARGET,
                code = command_error.code(),
                %command_error,
                "command failed"
            );
            protocol::error_response(
                envelope.id(),
                command_error.code(),
                &command_error.to_string(),
            )
        }
    };

    let exit = match endpoint.write_response(&response) {
        Ok(()) => 0,
        Err(framing_error) => {
            error!(target: AGENT_TARGET, %framing_error, "failed to write the response frame");
            EXIT_FRAMING_FAILURE
        }
    };
    controller.finish();
    exit
}
