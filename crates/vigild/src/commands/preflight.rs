//! CLI preflight run before a request is forwarded to the daemon.

use std::io::{self, Write};

use thiserror::Error;

use super::flags::ContextMode;
use super::registry::CommandRegistry;
use super::request::Request;
use super::resolver::resolve;
use super::response::{PduFormat, Response};

/// A request refused by the CLI preflight.
///
/// By the time this is returned the structured error object has already been
/// written to the output channel. The caller exits non-zero without talking to
/// the daemon.
#[derive(Debug, Error)]
pub enum CliRejection {
    /// Resolution or validation refused the request.
    #[error("{message}")]
    Rejected { message: String },

    /// The error object could not be written.
    #[error("failed to write CLI error for '{message}': {source}")]
    Write {
        message: String,
        #[source]
        source: io::Error,
    },
}

impl CliRejection {
    /// Message reported to the user.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message } | Self::Write { message, .. } => message,
        }
    }
}

/// Builds the error object emitted for a refused CLI request.
#[must_use]
pub fn cli_error_response(message: impl Into<String>) -> Response {
    Response::error(message).with("cli_validated", true)
}

/// Validates `request` for direct command-line invocation.
///
/// Unknown commands pass through silently so a newer daemon can answer them.
/// Known commands run their CLI validator, if any.
///
/// # Errors
///
/// Returns [`CliRejection`] after writing `{error, version, cli_validated}` to
/// `out` in `format` whenever resolution or validation fails.
pub fn preprocess_for_cli<W: Write>(
    registry: &CommandRegistry,
    request: &Request,
    format: PduFormat,
    out: &mut W,
) -> Result<(), CliRejection> {
    let failure = match resolve(registry, request, ContextMode::PERMISSIVE) {
        Ok(None) => return Ok(()),
        Ok(Some(descriptor)) => match descriptor.validate(request) {
            Ok(()) => return Ok(()),
            Err(message) => message,
        },
        Err(error) => error.to_string(),
    };

    match cli_error_response(failure.as_str()).write_pdu(format, out) {
        Ok(()) => Err(CliRejection::Rejected { message: failure }),
        Err(source) => Err(CliRejection::Write {
            message: failure,
            source,
        }),
    }
}
