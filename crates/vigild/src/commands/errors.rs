//! Error types for request decoding and dispatch rejections.
//!
//! The `Display` output of [`DispatchError`] is the exact text a client
//! receives in the `error` field of its response, so wording changes here are
//! protocol changes.

use std::sync::Arc;

use thiserror::Error;

/// Reasons a request is rejected before its handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The request carried no elements.
    #[error("invalid command (expected an array with some elements!)")]
    EmptyRequest,

    /// Element 0 was not text.
    #[error("invalid command: expected element 0 to be the command name")]
    MissingCommandName,

    /// The command exists but is not enabled for the current context.
    #[error("command {name} not available in this mode")]
    UnavailableInMode { name: String },

    /// No command is registered under the requested name.
    #[error("unknown command {name}")]
    UnknownCommand { name: String },

    /// The service is poisoned and the command is not immune.
    #[error("{reason}")]
    Poisoned { reason: Arc<str> },

    /// The client does not own the daemon and the command is owner-only.
    #[error("you must be the process owner to execute '{name}'")]
    NotOwner { name: String },
}

impl DispatchError {
    /// Creates an availability error for `name`.
    pub fn unavailable_in_mode(name: impl Into<String>) -> Self {
        Self::UnavailableInMode { name: name.into() }
    }

    /// Creates an unknown command error for `name`.
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Creates a poisoned-service error carrying the recorded reason.
    pub fn poisoned(reason: Arc<str>) -> Self {
        Self::Poisoned { reason }
    }

    /// Creates an authorization error for `name`.
    pub fn not_owner(name: impl Into<String>) -> Self {
        Self::NotOwner { name: name.into() }
    }
}

/// Failures decoding a request line into a [`super::Request`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line contained only whitespace.
    #[error("empty request line")]
    Empty,

    /// The line was not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[source] serde_json::Error),

    /// The line exceeded the per-request size limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge { size: usize, max_size: usize },
}
