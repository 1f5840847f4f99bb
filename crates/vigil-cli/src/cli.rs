//! CLI argument definitions for the `vigil` front-end.

use clap::{Parser, ValueEnum};
use vigild::commands::PduFormat;

/// Encoding used for everything the CLI prints on stdout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputEncoding {
    /// Compact JSON, one object per line.
    #[default]
    Json,
    /// Indented JSON.
    JsonPretty,
}

impl From<OutputEncoding> for PduFormat {
    fn from(encoding: OutputEncoding) -> Self {
        match encoding {
            OutputEncoding::Json => Self::Json,
            OutputEncoding::JsonPretty => Self::JsonPretty,
        }
    }
}

/// Command-line interface for the Vigil daemon.
#[derive(Parser, Debug)]
#[command(name = "vigil", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how responses are printed.
    #[arg(long, value_enum, default_value_t = OutputEncoding::Json)]
    pub(crate) output_encoding: OutputEncoding,
    /// The command to run (for example `version`).
    #[arg(value_name = "COMMAND")]
    pub(crate) command: Option<String>,
    /// Arguments forwarded to the command. Valid JSON is sent as JSON,
    /// anything else as a string.
    #[arg(
        value_name = "ARG",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) arguments: Vec<String>,
}
