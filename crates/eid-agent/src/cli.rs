//! CLI argument definitions.
//!
//! Browsers launch native-messaging hosts with a single argument recorded
//! in the host manifest; anything else on the command line is a packaging
//! mistake and fails startup.

use clap::Parser;

/// Native messaging helper for eID smart cards.
#[derive(Parser, Debug)]
#[command(name = "eid-agent", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Browser that launched the helper, as recorded in the
    /// native-messaging host manifest.
    #[arg(value_name = "BROWSER")]
    pub browser: Option<String>,
}
