//! Test harness utilities shared by the daemon unit and behavioural suites.

mod config_loader;
mod dispatch_reporter;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use dispatch_reporter::{DispatchEvent, RecordingDispatchReporter};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};
