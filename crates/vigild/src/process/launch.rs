//! Runs the daemon in the foreground with production collaborators.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{SystemConfigLoader, bootstrap_with};
use crate::health::StructuredHealthReporter;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::SystemShutdownSignal;

/// Bootstraps the daemon and serves until `shutdown-server` or a
/// termination signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, the listener or signal handling
/// fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let daemon = bootstrap_with(&SystemConfigLoader, Arc::new(StructuredHealthReporter::new()))?;
    info!(
        target: PROCESS_TARGET,
        pid = std::process::id(),
        endpoint = %daemon.config().daemon_socket(),
        "starting daemon runtime"
    );
    let shutdown = SystemShutdownSignal::new(daemon.shutdown_latch());
    daemon.serve(&shutdown)?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
