use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The signal watcher thread could not be spawned.
    #[error("failed to spawn signal watcher: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// One-shot latch released by the first shutdown request.
///
/// Both the `shutdown-server` command and process signals trigger the same
/// latch, so the serve loop has a single thing to wait on.
#[derive(Debug, Default)]
pub struct ShutdownLatch {
    triggered: Mutex<bool>,
    released: Condvar,
}

impl ShutdownLatch {
    /// Builds an untriggered latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases every waiter. Later calls have no further effect.
    pub fn trigger(&self) {
        let mut triggered = self
            .triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !*triggered {
            *triggered = true;
            info!(target: PROCESS_TARGET, "shutdown requested");
        }
        self.released.notify_all();
    }

    /// Returns true once the latch has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self
            .triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the latch is triggered.
    pub fn block(&self) {
        let mut triggered = self
            .triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*triggered {
            triggered = self
                .released
                .wait(triggered)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the latch is triggered or `timeout` elapses.
    ///
    /// Returns true when the latch was triggered.
    pub fn block_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut triggered = self
            .triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*triggered {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = self
                .released
                .wait_timeout(triggered, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            triggered = guard;
        }
        true
    }
}

impl ShutdownSignal for ShutdownLatch {
    fn wait(&self) -> Result<(), ShutdownError> {
        self.block();
        Ok(())
    }
}

impl<T> ShutdownSignal for Arc<T>
where
    T: ShutdownSignal,
{
    fn wait(&self) -> Result<(), ShutdownError> {
        (**self).wait()
    }
}

/// Shutdown listener that waits for termination signals or the latch,
/// whichever comes first.
#[derive(Debug, Clone)]
pub struct SystemShutdownSignal {
    latch: Arc<ShutdownLatch>,
}

impl SystemShutdownSignal {
    /// Builds a listener that also releases `latch` on a signal.
    #[must_use]
    pub fn new(latch: Arc<ShutdownLatch>) -> Self {
        Self { latch }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let latch = Arc::clone(&self.latch);
        let watcher = thread::Builder::new()
            .name("vigild-signals".to_owned())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!(target: PROCESS_TARGET, signal, "shutdown signal received");
                    latch.trigger();
                }
            })
            .map_err(|source| ShutdownError::Spawn { source })?;

        self.latch.block();
        handle.close();
        if watcher.join().is_err() {
            warn!(target: PROCESS_TARGET, "signal watcher panicked");
        }
        Ok(())
    }
}
