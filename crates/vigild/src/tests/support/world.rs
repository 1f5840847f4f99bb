//! BDD world covering bootstrap and a daemon serving on a temporary socket.

use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::process::ShutdownLatch;

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    socket_path: Option<String>,
    pub reporter: Arc<RecordingHealthReporter>,
    daemon: Option<Arc<Daemon>>,
    bootstrap_error: Option<BootstrapError>,
    server: Option<JoinHandle<Result<(), String>>>,
    shutdown: Option<Arc<ShutdownLatch>>,
    responses: Vec<Value>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        let loader = TestConfigLoader::new();
        Self {
            socket_path: Some(loader.socket_path()),
            loader: Box::new(loader),
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemon: None,
            bootstrap_error: None,
            server: None,
            shutdown: None,
            responses: Vec::new(),
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader::new());
        self.socket_path = None;
        self.reset_results();
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        let loader = TestConfigLoader::new();
        self.socket_path = Some(loader.socket_path());
        self.loader = Box::new(loader);
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(Arc::new(daemon)),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Bootstrapped daemon, if any.
    #[must_use]
    pub fn daemon(&self) -> Option<&Daemon> {
        self.daemon.as_deref()
    }

    /// Bootstraps if needed and serves on a background thread.
    pub fn start_serving(&mut self) {
        self.bootstrap();
        let daemon = Arc::clone(self.daemon.as_ref().expect("bootstrap should succeed"));
        let latch = daemon.shutdown_latch();
        self.shutdown = Some(Arc::clone(&latch));
        self.server = Some(thread::spawn(move || {
            daemon.serve(&*latch).map_err(|error| error.to_string())
        }));
    }

    /// Sends one request line and collects every response until EOF.
    pub fn send(&mut self, request: &Value) {
        let mut stream = self.connect();
        let mut line = serde_json::to_vec(request).expect("serialise request");
        line.push(b'\n');
        stream.write_all(&line).expect("write request");
        stream.shutdown(Shutdown::Write).expect("close write half");

        self.responses = BufReader::new(stream)
            .lines()
            .map(|line| serde_json::from_str(&line.expect("read response")).expect("json response"))
            .collect();
    }

    /// Responses to the latest request.
    #[must_use]
    pub fn responses(&self) -> &[Value] {
        &self.responses
    }

    /// First response to the latest request.
    #[must_use]
    pub fn response(&self) -> &Value {
        self.responses.first().expect("at least one response")
    }

    /// Waits for the serve loop to exit.
    pub fn wait_for_exit(&mut self) -> Result<(), String> {
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        while self.server.as_ref().is_some_and(|handle| !handle.is_finished()) {
            if Instant::now() >= deadline {
                return Err("daemon still serving".to_owned());
            }
            thread::sleep(Duration::from_millis(10));
        }
        match self.server.take() {
            Some(handle) => handle.join().map_err(|_| "serve thread panicked".to_owned())?,
            None => Err("daemon was never started".to_owned()),
        }
    }

    fn connect(&self) -> UnixStream {
        let path = self.socket_path.as_deref().expect("socket path configured");
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        loop {
            match UnixStream::connect(path) {
                Ok(stream) => return stream,
                Err(error) if Instant::now() >= deadline => {
                    panic!("failed to connect to {path}: {error}")
                }
                Err(_) => thread::sleep(Duration::from_millis(10)),
            }
        }
    }

    fn reset_results(&mut self) {
        self.stop();
        self.daemon = None;
        self.bootstrap_error = None;
        self.responses.clear();
    }

    fn stop(&mut self) {
        if let Some(latch) = self.shutdown.take() {
            latch.trigger();
        }
        if let Some(handle) = self.server.take() {
            drop(handle.join());
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fixture constructor shared by the behavioural suites.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
