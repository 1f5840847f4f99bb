//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use vigil_config::{Config, SocketPreparationError};

use crate::builtin::{BuiltinServices, register_builtins};
use crate::commands::{
    CommandRegistry, DispatchReporter, DispatchSettings, Dispatcher, PoisonState,
    StructuredDispatchReporter,
};
use crate::health::HealthReporter;
use crate::process::{LaunchError, ShutdownLatch, ShutdownSignal};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{SessionHandler, SocketListener};

/// Prefix of the capability advertising the active transport.
pub const TRANSPORT_CAPABILITY_PREFIX: &str = "transport-";

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already loaded configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// A bootstrapped daemon whose command registry is frozen.
pub struct Daemon {
    config: Config,
    registry: Arc<CommandRegistry>,
    services: BuiltinServices,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
    dispatch_reporter: Arc<dyn DispatchReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Frozen command registry shared by every session.
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Process-wide poison flag.
    #[must_use]
    pub fn poison_state(&self) -> &Arc<PoisonState> {
        &self.services.poison
    }

    /// Latch released by `shutdown-server`.
    #[must_use]
    pub fn shutdown_latch(&self) -> Arc<ShutdownLatch> {
        Arc::clone(&self.services.shutdown)
    }

    /// Replaces the dispatch outcome reporter used by new sessions.
    #[must_use]
    pub fn with_dispatch_reporter(mut self, reporter: Arc<dyn DispatchReporter>) -> Self {
        self.dispatch_reporter = reporter;
        self
    }

    /// Builds a dispatcher over the frozen registry.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.services.poison),
            DispatchSettings::from_config(&self.config),
        )
        .with_reporter(Arc::clone(&self.dispatch_reporter))
    }

    /// Binds the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Listener`] when binding fails.
    pub fn bind(&self) -> Result<SocketListener, LaunchError> {
        SocketListener::bind(self.config.daemon_socket()).map_err(|source| {
            self.reporter.listener_failed(&source);
            LaunchError::Listener { source }
        })
    }

    /// Binds the configured endpoint and serves sessions until `shutdown`
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the listener or the shutdown wait fails.
    pub fn serve(&self, shutdown: &dyn ShutdownSignal) -> Result<(), LaunchError> {
        let listener = self.bind()?;
        self.serve_on(listener, shutdown)
    }

    /// Serves sessions on an already bound listener until `shutdown` returns.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the listener or the shutdown wait fails.
    pub fn serve_on(
        &self,
        listener: SocketListener,
        shutdown: &dyn ShutdownSignal,
    ) -> Result<(), LaunchError> {
        let endpoint = listener.endpoint().clone();
        let handler = Arc::new(SessionHandler::new(self.dispatcher()));
        let handle = listener.start(handler).map_err(|source| {
            self.reporter.listener_failed(&source);
            LaunchError::Listener { source }
        })?;
        self.reporter.listener_ready(&endpoint);

        let waited = shutdown.wait();
        handle.shutdown();
        let joined = handle.join();
        self.reporter.listener_stopped(&endpoint);

        waited.map_err(|source| LaunchError::Shutdown { source })?;
        joined.map_err(|source| {
            self.reporter.listener_failed(&source);
            LaunchError::Listener { source }
        })
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or socket
/// preparation fails. The reporter sees every failure.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    config
        .daemon_socket()
        .prepare_filesystem()
        .map_err(|source| fail(BootstrapError::Socket { source }))?;

    let services = BuiltinServices::default();
    let registry = build_registry(&config, &services);
    reporter.bootstrap_succeeded(&config, registry.len());

    Ok(Daemon {
        config,
        registry: Arc::new(registry),
        services,
        telemetry,
        reporter,
        dispatch_reporter: Arc::new(StructuredDispatchReporter),
    })
}

fn build_registry(config: &Config, services: &BuiltinServices) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry, services);
    registry.register_capability(format!(
        "{TRANSPORT_CAPABILITY_PREFIX}{}",
        config.daemon_socket().transport()
    ));
    services.capabilities.publish(registry.capabilities());
    registry
}
