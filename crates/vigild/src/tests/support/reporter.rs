//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use vigil_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::transport::ListenerError;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed with this many commands registered.
    BootstrapSucceeded { commands: usize },
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The listener started on an endpoint.
    ListenerReady(String),
    /// The listener failed.
    ListenerFailed(String),
    /// The listener stopped.
    ListenerStopped(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config, commands: usize) {
        self.record(HealthEvent::BootstrapSucceeded { commands });
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerReady(endpoint.to_string()));
    }

    fn listener_failed(&self, error: &ListenerError) {
        self.record(HealthEvent::ListenerFailed(error.to_string()));
    }

    fn listener_stopped(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerStopped(endpoint.to_string()));
    }
}
