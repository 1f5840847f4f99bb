//! Session dispatch: resolution, admission and handler invocation.
//!
//! Every request flows through the same ordered pipeline:
//!
//! 1. record the request as the client's current command;
//! 2. resolve it in session mode;
//! 3. run the admission gates ([`ADMISSION_GATES`]) in order, stopping at the
//!    first rejection;
//! 4. time the handler with a [`PerfSample`] and report slow calls.
//!
//! Rejections produce exactly one error response. The client's scoped slots
//! are cleared on every exit, including authorization failures.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use vigil_config::{Config, default_slow_command_threshold};

use super::client::ClientContext;
use super::errors::DispatchError;
use super::flags::{CommandFlags, ContextMode};
use super::perf::PerfSample;
use super::poison::PoisonState;
use super::registry::{CommandDescriptor, CommandRegistry};
use super::request::Request;
use super::resolver::resolve;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Prefix for the names of dispatch performance samples.
pub const DISPATCH_SAMPLE_PREFIX: &str = "dispatch_command:";

/// Tunables consumed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSettings {
    slow_command_threshold: Duration,
}

impl DispatchSettings {
    /// Builds settings with an explicit slow-call threshold.
    #[must_use]
    pub fn new(slow_command_threshold: Duration) -> Self {
        Self {
            slow_command_threshold,
        }
    }

    /// Derives settings from the daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.slow_command_threshold())
    }

    /// Wall time above which a command is reported as slow.
    #[must_use]
    pub fn slow_command_threshold(&self) -> Duration {
        self.slow_command_threshold
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::new(default_slow_command_threshold())
    }
}

/// Observer for dispatch outcomes.
pub trait DispatchReporter: Send + Sync {
    /// Invoked when a command exceeded the slow-call threshold. The sample
    /// already carries the request under the `args` metadata key.
    fn slow_command(&self, sample: &PerfSample);

    /// Invoked when a command finished within the threshold.
    fn command_completed(&self, name: &str, wall_time: Duration);

    /// Invoked when a request was refused before its handler ran.
    fn command_rejected(&self, name: Option<&str>, error: &DispatchError);
}

impl<T> DispatchReporter for Arc<T>
where
    T: DispatchReporter,
{
    fn slow_command(&self, sample: &PerfSample) {
        (**self).slow_command(sample);
    }

    fn command_completed(&self, name: &str, wall_time: Duration) {
        (**self).command_completed(name, wall_time);
    }

    fn command_rejected(&self, name: Option<&str>, error: &DispatchError) {
        (**self).command_rejected(name, error);
    }
}

/// Default reporter that records outcomes using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDispatchReporter;

impl DispatchReporter for StructuredDispatchReporter {
    fn slow_command(&self, sample: &PerfSample) {
        sample.log();
    }

    fn command_completed(&self, name: &str, wall_time: Duration) {
        debug!(
            target: DISPATCH_TARGET,
            command = %name,
            wall_time_us = u64::try_from(wall_time.as_micros()).unwrap_or(u64::MAX),
            "command completed"
        );
    }

    fn command_rejected(&self, name: Option<&str>, error: &DispatchError) {
        debug!(
            target: DISPATCH_TARGET,
            command = name.unwrap_or("<none>"),
            error = %error,
            "command rejected"
        );
    }
}

/// Inputs visible to an admission gate.
#[derive(Debug, Clone, Copy)]
pub struct Admission<'a> {
    /// Descriptor the request resolved to.
    pub descriptor: &'a CommandDescriptor,
    /// Client issuing the request.
    pub client: &'a ClientContext,
    /// Process-wide health flag.
    pub poison: &'a PoisonState,
}

/// Predicate deciding whether a resolved command may run.
pub type AdmissionGate = fn(&Admission<'_>) -> Result<(), DispatchError>;

/// Gates evaluated in order; the first rejection wins.
pub const ADMISSION_GATES: [AdmissionGate; 2] = [poison_gate, owner_gate];

/// Refuses non-immune commands while the service is poisoned.
///
/// # Errors
///
/// Returns [`DispatchError::Poisoned`] with the recorded reason.
pub fn poison_gate(admission: &Admission<'_>) -> Result<(), DispatchError> {
    if admission.descriptor.has_flag(CommandFlags::POISON_IMMUNE) {
        return Ok(());
    }
    admission
        .poison
        .check()
        .map_or(Ok(()), |reason| Err(DispatchError::poisoned(reason)))
}

/// Refuses owner-only commands for clients that do not own the daemon.
///
/// # Errors
///
/// Returns [`DispatchError::NotOwner`] naming the command.
pub fn owner_gate(admission: &Admission<'_>) -> Result<(), DispatchError> {
    if admission.client.is_owner() || admission.descriptor.has_flag(CommandFlags::ALLOW_ANY_USER) {
        Ok(())
    } else {
        Err(DispatchError::not_owner(admission.descriptor.name()))
    }
}

/// Runs every gate in [`ADMISSION_GATES`] with short-circuit semantics.
///
/// # Errors
///
/// Returns the first gate's rejection.
pub fn admit(admission: &Admission<'_>) -> Result<(), DispatchError> {
    ADMISSION_GATES.iter().try_for_each(|gate| gate(admission))
}

/// Routes decoded session requests to their command handlers.
///
/// The dispatcher holds shared, read-only handles and may be called
/// concurrently from every session worker.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    poison: Arc<PoisonState>,
    settings: DispatchSettings,
    reporter: Arc<dyn DispatchReporter>,
}

impl Dispatcher {
    /// Creates a dispatcher reporting through [`StructuredDispatchReporter`].
    #[must_use]
    pub fn new(
        registry: Arc<CommandRegistry>,
        poison: Arc<PoisonState>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            poison,
            settings,
            reporter: Arc::new(StructuredDispatchReporter),
        }
    }

    /// Replaces the outcome reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn DispatchReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Registry consulted for resolution.
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Health flag consulted by the poison gate.
    #[must_use]
    pub fn poison_state(&self) -> &Arc<PoisonState> {
        &self.poison
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// Dispatches `request` for `client`.
    ///
    /// Returns true once the handler has been invoked, whatever it reported.
    /// Returns false after queuing exactly one error response when the
    /// request is rejected.
    pub fn dispatch(&self, client: &mut ClientContext, request: &Request) -> bool {
        client.begin_command(request);
        let handled = match self.admit_request(client, request) {
            Ok(descriptor) => {
                self.execute(&descriptor, client, request);
                true
            }
            Err(error) => {
                self.reporter
                    .command_rejected(request.command_name(), &error);
                client.send_error_response(error.to_string());
                false
            }
        };
        client.end_command();
        handled
    }

    fn admit_request(
        &self,
        client: &ClientContext,
        request: &Request,
    ) -> Result<Arc<CommandDescriptor>, DispatchError> {
        let descriptor = resolve(&self.registry, request, ContextMode::SESSION)?
            .ok_or_else(|| {
                DispatchError::unknown_command(request.command_name().unwrap_or_default())
            })?;
        admit(&Admission {
            descriptor: &descriptor,
            client,
            poison: &self.poison,
        })?;
        Ok(descriptor)
    }

    fn execute(
        &self,
        descriptor: &CommandDescriptor,
        client: &mut ClientContext,
        request: &Request,
    ) {
        let mut sample =
            PerfSample::start(format!("{DISPATCH_SAMPLE_PREFIX}{}", descriptor.name()));
        sample.set_wall_time_threshold(self.settings.slow_command_threshold);
        client.attach_perf_sample(sample);

        descriptor.execute(client, request);

        let Some(mut sample) = client.detach_perf_sample() else {
            return;
        };
        if sample.finish() {
            sample.add_meta("args", request.to_value());
            self.reporter.slow_command(&sample);
        } else {
            self.reporter
                .command_completed(descriptor.name(), sample.wall_time().unwrap_or_default());
        }
    }
}
