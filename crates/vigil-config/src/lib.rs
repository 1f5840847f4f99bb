//! Shared configuration for the Vigil daemon and its command-line front-end.
//!
//! Both binaries resolve the same [`Config`] through `ortho_config`, layering
//! built-in defaults, an optional configuration file, `VIGIL_*` environment
//! variables and command-line flags (highest precedence). Keeping a single
//! definition ensures the CLI and the daemon agree on the socket endpoint and
//! on dispatch tunables such as the slow command threshold.

use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod socket;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SLOW_COMMAND_THRESHOLD_SECONDS, DEFAULT_TCP_PORT,
    default_log_filter, default_log_filter_string, default_log_format,
    default_slow_command_threshold, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved configuration shared by `vigild` and `vigil`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "VIGIL")]
pub struct Config {
    /// Endpoint the daemon listens on and the CLI connects to.
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter expression applied by the daemon.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon telemetry.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Wall time, in seconds, above which a dispatched command is logged as slow.
    #[ortho_config(default = DEFAULT_SLOW_COMMAND_THRESHOLD_SECONDS)]
    pub slow_command_log_threshold_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            slow_command_log_threshold_seconds: DEFAULT_SLOW_COMMAND_THRESHOLD_SECONDS,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any configuration layer fails
    /// to parse.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the binary name, mirroring
    /// [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any configuration layer fails
    /// to parse.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Socket endpoint used by the daemon.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Telemetry output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Slow command threshold as a [`Duration`].
    ///
    /// Values that cannot describe a wall time (negative, NaN or infinite)
    /// resolve to [`default_slow_command_threshold`].
    #[must_use]
    pub fn slow_command_threshold(&self) -> Duration {
        Duration::try_from_secs_f64(self.slow_command_log_threshold_seconds)
            .unwrap_or_else(|_| default_slow_command_threshold())
    }
}
