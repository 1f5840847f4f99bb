//! Decoded client requests.
//!
//! A request is an ordered sequence whose first element names the command.
//! The remaining elements are command-specific and opaque to the dispatch
//! core. Structural validation (non-empty, textual command name) happens in
//! the resolver so that malformed input is reported like any other
//! resolution failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DecodeError;

/// Maximum size of a single request line, delimiter included.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Ordered request elements as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request(Vec<Value>);

impl Request {
    /// Builds a request from its elements.
    #[must_use]
    pub fn new(elements: Vec<Value>) -> Self {
        Self(elements)
    }

    /// Converts an arbitrary decoded PDU into a request.
    ///
    /// Values other than arrays carry no elements and therefore fail
    /// resolution.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(elements) => Self(elements),
            _ => Self::default(),
        }
    }

    /// Decodes a single JSON line.
    ///
    /// Trailing whitespace, including the newline delimiter, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the line is blank or not valid JSON.
    pub fn parse(line: &[u8]) -> Result<Self, DecodeError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(DecodeError::Empty);
        }
        serde_json::from_slice(trimmed)
            .map(Self::from_value)
            .map_err(DecodeError::Json)
    }

    /// All request elements, command name included.
    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.0
    }

    /// Element at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the request has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Command name when element 0 is text.
    #[must_use]
    pub fn command_name(&self) -> Option<&str> {
        self.0.first().and_then(Value::as_str)
    }

    /// Request as a JSON array, for diagnostics and perf metadata.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.clone())
    }
}

impl From<Vec<Value>> for Request {
    fn from(elements: Vec<Value>) -> Self {
        Self::new(elements)
    }
}
