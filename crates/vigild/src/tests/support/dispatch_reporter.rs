//! Test double for [`DispatchReporter`].

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::commands::{DispatchError, DispatchReporter, PerfSample};

/// Dispatch outcomes captured during a test.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A command exceeded the threshold; `args` is the attached request.
    Slow { name: String, args: Option<Value> },
    /// A command finished within the threshold.
    Completed { name: String, wall_time: Duration },
    /// A request was refused before its handler ran.
    Rejected {
        name: Option<String>,
        error: DispatchError,
    },
}

/// Records dispatch outcomes for assertions.
#[derive(Debug, Default)]
pub struct RecordingDispatchReporter {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingDispatchReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .expect("dispatch reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: DispatchEvent) {
        self.events
            .lock()
            .expect("dispatch reporter mutex poisoned")
            .push(event);
    }
}

impl DispatchReporter for RecordingDispatchReporter {
    fn slow_command(&self, sample: &PerfSample) {
        self.record(DispatchEvent::Slow {
            name: sample.name().to_owned(),
            args: sample.meta("args").cloned(),
        });
    }

    fn command_completed(&self, name: &str, wall_time: Duration) {
        self.record(DispatchEvent::Completed {
            name: name.to_owned(),
            wall_time,
        });
    }

    fn command_rejected(&self, name: Option<&str>, error: &DispatchError) {
        self.record(DispatchEvent::Rejected {
            name: name.map(str::to_owned),
            error: error.clone(),
        });
    }
}
