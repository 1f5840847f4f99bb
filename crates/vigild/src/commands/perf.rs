//! Wall-clock performance samples for dispatched commands.
//!
//! A sample only observes: exceeding the threshold never aborts the command,
//! it only makes the sample eligible for a structured log record.

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::warn;

/// Tracing target for slow command records.
pub(crate) const PERF_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::perf");

/// Timed instrumentation record for one unit of work.
#[derive(Debug, Clone)]
pub struct PerfSample {
    name: String,
    started: Instant,
    wall_time: Option<Duration>,
    threshold: Option<Duration>,
    meta: Map<String, Value>,
}

impl PerfSample {
    /// Starts timing a sample called `name`.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
            wall_time: None,
            threshold: None,
            meta: Map::new(),
        }
    }

    /// Sample name, for example `dispatch_command:version`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the wall time above which [`Self::finish`] reports the sample.
    pub fn set_wall_time_threshold(&mut self, threshold: Duration) {
        self.threshold = Some(threshold);
    }

    /// Configured threshold, if any.
    #[must_use]
    pub fn wall_time_threshold(&self) -> Option<Duration> {
        self.threshold
    }

    /// Stops the clock and reports whether the threshold was exceeded.
    ///
    /// Without a threshold the sample never counts as slow. Calling `finish`
    /// again re-measures from the original start.
    pub fn finish(&mut self) -> bool {
        let elapsed = self.started.elapsed();
        self.wall_time = Some(elapsed);
        self.threshold.is_some_and(|threshold| elapsed > threshold)
    }

    /// Measured wall time once [`Self::finish`] has run.
    #[must_use]
    pub fn wall_time(&self) -> Option<Duration> {
        self.wall_time
    }

    /// Attaches a metadata value under `key`, replacing any previous value.
    pub fn add_meta(&mut self, key: impl Into<String>, value: Value) {
        self.meta.insert(key.into(), value);
    }

    /// Metadata value stored under `key`.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// All metadata as one JSON object.
    #[must_use]
    pub fn meta_object(&self) -> Value {
        Value::Object(self.meta.clone())
    }

    /// Emits the sample as a structured warning record.
    pub fn log(&self) {
        let wall_time_ms = self.wall_time.map_or(0, millis);
        let threshold_ms = self.threshold.map_or(0, millis);
        let meta = self.meta_object();
        warn!(
            target: PERF_TARGET,
            description = %self.name,
            wall_time_ms,
            threshold_ms,
            meta = %meta,
            "slow command"
        );
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
