//! Command dispatch core.
//!
//! Clients send a JSON array per line. Element 0 names the command and the
//! remaining elements are its arguments:
//!
//! ```json
//! ["version", {"required": ["cmd-get-pid"]}]
//! ```
//!
//! Each request is resolved against the [`CommandRegistry`], admitted past
//! the poison and ownership gates, then handed to the command's handler. The
//! daemon answers with one JSON object per line, always carrying `version`:
//!
//! ```json
//! {"version":"0.1.0","capabilities":{"cmd-get-pid":true}}
//! ```
//!
//! Rejected requests receive an object whose only payload is `error`.
//!
//! ## Lifecycle
//!
//! Command modules register descriptors while the daemon starts up. The
//! registry is then frozen behind an `Arc` and shared read-only by every
//! session worker. [`PoisonState`] is the one shared value that may change
//! while requests are in flight.
//!
//! The CLI front-end uses [`preprocess_for_cli`] against its own copy of the
//! registry, in permissive mode, before forwarding a request.

mod capabilities;
mod client;
mod dispatcher;
mod errors;
mod flags;
mod perf;
mod poison;
mod preflight;
mod registry;
mod request;
mod resolver;
mod response;

pub use self::capabilities::{COMMAND_CAPABILITY_PREFIX, CapabilityRegistry, command_capability};
pub use self::client::ClientContext;
pub use self::dispatcher::{
    ADMISSION_GATES, Admission, AdmissionGate, DISPATCH_SAMPLE_PREFIX, DispatchReporter,
    DispatchSettings, Dispatcher, StructuredDispatchReporter, admit, owner_gate, poison_gate,
};
pub use self::errors::{DecodeError, DispatchError};
pub use self::flags::{CommandFlags, ContextMode};
pub use self::perf::PerfSample;
pub use self::poison::PoisonState;
pub use self::preflight::{CliRejection, cli_error_response, preprocess_for_cli};
pub use self::registry::{CliValidator, CommandDescriptor, CommandHandler, CommandRegistry};
pub use self::request::{MAX_REQUEST_BYTES, Request};
pub use self::resolver::resolve;
pub use self::response::{PduFormat, Response, VERSION};
