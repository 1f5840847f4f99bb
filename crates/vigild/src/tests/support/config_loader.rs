//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use ortho_config::OrthoError;
use tempfile::TempDir;
use vigil_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that provisions a Unix socket path under a temporary directory.
pub struct TestConfigLoader {
    socket_dir: TempDir,
    slow_command_log_threshold_seconds: f64,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("failed to create temporary directory for socket"),
            slow_command_log_threshold_seconds: 60.0,
        }
    }

    /// Overrides the slow command threshold handed to the daemon.
    #[must_use]
    pub fn with_threshold_seconds(mut self, seconds: f64) -> Self {
        self.slow_command_log_threshold_seconds = seconds;
        self
    }

    /// Socket path the daemon will bind.
    #[must_use]
    pub fn socket_path(&self) -> String {
        self.socket_dir
            .path()
            .join("run")
            .join("vigild.sock")
            .to_str()
            .expect("temporary socket path was not valid UTF-8")
            .to_owned()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(self.socket_path()),
            slow_command_log_threshold_seconds: self.slow_command_log_threshold_seconds,
            ..Config::default()
        })
    }
}

/// Loader that fails by pointing `--config-path` at a malformed file.
pub struct FailingConfigLoader {
    dir: TempDir,
}

impl FailingConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary config directory");
        fs::write(dir.path().join("vigil.toml"), "log_format = [broken")
            .expect("failed to write malformed config");
        Self { dir }
    }
}

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("vigild"),
            OsString::from("--config-path"),
            self.dir.path().join("vigil.toml").into_os_string(),
        ])
    }
}
