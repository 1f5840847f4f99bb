//! Shared fixtures for the CLI unit tests.

mod fake_daemon;

use std::ffi::OsString;

use vigil_config::{Config, SocketEndpoint};

use crate::config::ConfigLoader;
use crate::errors::AppError;

pub(in crate::tests) use fake_daemon::FakeDaemon;

/// Loader that points the CLI at a fixed endpoint and records the flags it saw.
pub(in crate::tests) struct TestConfigLoader {
    endpoint: SocketEndpoint,
    seen: std::cell::RefCell<Vec<OsString>>,
}

impl TestConfigLoader {
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            seen: std::cell::RefCell::default(),
        }
    }

    /// Loader for a fake daemon's TCP port.
    pub fn tcp(port: u16) -> Self {
        Self::new(SocketEndpoint::tcp("127.0.0.1", port))
    }

    /// Configuration arguments handed to the most recent load.
    pub fn seen_arguments(&self) -> Vec<OsString> {
        self.seen.borrow().clone()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        *self.seen.borrow_mut() = args.to_vec();
        Ok(Config {
            daemon_socket: self.endpoint.clone(),
            ..Config::default()
        })
    }
}

/// Converts string literals into the `OsString` arguments the runtime expects.
pub(in crate::tests) fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}
