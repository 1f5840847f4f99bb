//! Response envelope and PDU encoding.
//!
//! Every response is a JSON object carrying the build `version`. Error
//! responses add a single `error` field with the literal message text.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::{Map, Value};

/// Build version advertised in every response envelope.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Encoding used when writing a response PDU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PduFormat {
    /// Compact JSON, one object per line.
    #[default]
    Json,
    /// Indented JSON for terminal readers.
    JsonPretty,
}

/// A response object queued for a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Response(Map<String, Value>);

impl Response {
    /// Creates an empty response carrying only the envelope fields.
    #[must_use]
    pub fn new() -> Self {
        let mut fields = Map::new();
        fields.insert("version".to_owned(), Value::from(VERSION));
        Self(fields)
    }

    /// Creates an error response with the given message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new().with("error", message.into())
    }

    /// Adds or replaces a field, returning the updated response.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces a field in place.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_owned(), value.into());
    }

    /// Field value, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Error message when this is an error response.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    /// Returns true when the response reports an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.0.contains_key("error")
    }

    /// Writes the response as one PDU followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    pub fn write_pdu<W: Write>(&self, format: PduFormat, writer: &mut W) -> io::Result<()> {
        match format {
            PduFormat::Json => serde_json::to_writer(&mut *writer, &self.0)?,
            PduFormat::JsonPretty => serde_json::to_writer_pretty(&mut *writer, &self.0)?,
        }
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Response> for Value {
    fn from(response: Response) -> Self {
        Self::Object(response.0)
    }
}
