//! Command dispatch daemon for Vigil.
//!
//! The daemon accepts client sessions over a socket configured via
//! [`vigil_config`], decodes newline-framed JSON requests and routes each one
//! through the [`commands::Dispatcher`]. The crate is organised around the
//! request lifecycle:
//!
//! - [`commands`] holds the registries, the resolver, the poison flag, the
//!   dispatcher and the CLI preflight.
//! - [`builtin`] registers the commands every build ships with.
//! - [`transport`] binds the endpoint and runs one worker per session.
//! - Bootstrap wires these together, emitting health telemetry at each stage
//!   so operators can diagnose startup failures.
//!
//! ## Poisoning
//!
//! When a collaborator detects a fault the daemon cannot recover from it
//! calls [`commands::PoisonState::poison`]. From then on every command not
//! flagged as poison-immune is refused with the recorded reason until the
//! process restarts. `version`, `list-capabilities` and `shutdown-server`
//! remain available for diagnosis.

mod bootstrap;
pub mod builtin;
pub mod commands;
mod health;
mod process;
pub mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader,
    TRANSPORT_CAPABILITY_PREFIX, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownLatch, ShutdownSignal, SystemShutdownSignal, run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
