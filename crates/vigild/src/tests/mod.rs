//! Test suites for the vigil daemon.

mod dispatch_behaviour;
pub(crate) mod support;
