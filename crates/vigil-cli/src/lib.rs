//! Command-line front-end for the Vigil daemon.
//!
//! The runtime splits configuration flags from the command tokens, builds a
//! JSON request of the form `[command, args...]` and runs the CLI preflight
//! against the builtin command table. A refused request is answered locally,
//! on stdout, without contacting the daemon. Accepted requests are forwarded
//! over the configured socket and every response is echoed back in the
//! selected encoding.
//!
//! Arguments that parse as JSON are sent as JSON, so
//! `vigil version '{"required":["cmd-get-pid"]}'` negotiates capabilities,
//! while anything else travels as a string.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches};
use serde_json::Value;
use vigild::builtin::{BuiltinServices, builtin_registry};
use vigild::commands::{CliRejection, CommandRegistry, PduFormat, Request, preprocess_for_cli};

mod cli;
mod config;
mod errors;
mod transport;

pub use cli::OutputEncoding;
use cli::Cli;
use config::{ConfigArgumentSplit, ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::{AppError, is_daemon_not_running};
use transport::connect;

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
    registry: CommandRegistry,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
            registry: builtin_registry(&BuiltinServices::default()),
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let cli = match self.parse(split.cli_arguments(&args)) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(error),
        };
        let Some(command) = cli.command.as_deref() else {
            let _ = write!(self.stderr, "{}", usage(&self.registry));
            return ExitCode::FAILURE;
        };

        let request = build_request(command, &cli.arguments);
        match self.execute(&split, &request, cli.output_encoding.into()) {
            Ok(exit_code) => exit_code,
            Err(AppError::Preflight(CliRejection::Rejected { .. })) => ExitCode::FAILURE,
            Err(error) => {
                let _ = writeln!(self.stderr, "{error}");
                if is_daemon_not_running(&error) {
                    let _ = writeln!(self.stderr, "is vigild running?");
                }
                ExitCode::FAILURE
            }
        }
    }

    fn parse(&self, args: Vec<OsString>) -> Result<Cli, clap::Error> {
        let matches = Cli::command()
            .after_help(available_commands(&self.registry))
            .try_get_matches_from(args)?;
        Cli::from_arg_matches(&matches)
    }

    fn report_usage(&mut self, error: clap::Error) -> ExitCode {
        match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = write!(self.stdout, "{}", error.render());
                ExitCode::SUCCESS
            }
            _ => {
                let _ = write!(self.stderr, "{}", AppError::CliUsage(error));
                ExitCode::FAILURE
            }
        }
    }

    fn execute(
        &mut self,
        split: &ConfigArgumentSplit,
        request: &Request,
        format: PduFormat,
    ) -> Result<ExitCode, AppError> {
        preprocess_for_cli(&self.registry, request, format, &mut *self.stdout)
            .map_err(AppError::Preflight)?;

        let config = self.loader.load(&split.config_arguments)?;
        let responses = connect(config.daemon_socket())?.exchange(request)?;

        let mut failed = false;
        for response in &responses {
            failed |= response.get("error").is_some();
            write_response(response, format, &mut *self.stdout)?;
        }
        Ok(if failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        })
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(stdout, stderr, loader).run(args)
}

/// Builds `[command, args...]`, decoding each argument as JSON when possible.
fn build_request(command: &str, arguments: &[String]) -> Request {
    let elements = std::iter::once(Value::from(command))
        .chain(arguments.iter().map(|argument| {
            serde_json::from_str(argument).unwrap_or_else(|_| Value::from(argument.as_str()))
        }))
        .collect();
    Request::new(elements)
}

fn available_commands(registry: &CommandRegistry) -> String {
    let mut text = String::from("Available commands:\n");
    for descriptor in registry.descriptors() {
        let _ = writeln!(text, "  {}", descriptor.name());
    }
    text
}

fn usage(registry: &CommandRegistry) -> String {
    format!(
        "{}\n\n{}",
        Cli::command().render_usage(),
        available_commands(registry)
    )
}

fn write_response<W: Write>(
    response: &Value,
    format: PduFormat,
    out: &mut W,
) -> Result<(), AppError> {
    let encoded = match format {
        PduFormat::Json => serde_json::to_string(response),
        PduFormat::JsonPretty => serde_json::to_string_pretty(response),
    }
    .map_err(|error| AppError::EmitResponse(io::Error::other(error)))?;
    writeln!(out, "{encoded}").map_err(AppError::EmitResponse)?;
    out.flush().map_err(AppError::EmitResponse)
}

#[cfg(test)]
mod tests;
