//! Binary entrypoint for the eID agent.
//!
//! The binary delegates to [`eid_agent::run`], which parses the browser
//! argument, loads configuration, reads one native-messaging frame from
//! stdin, drives the command controller, and writes the response frame to
//! stdout.

use std::io::{self, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    ExitCode::from(eid_agent::run(std::env::args_os(), &mut stdin, &mut stdout))
}
