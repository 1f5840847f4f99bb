//! Endpoint binding and the background accept loop.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use vigil_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, ListenerError, TRANSPORT_TARGET};

#[cfg(unix)]
use std::os::unix::net::UnixListener;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// A bound endpoint that has not started accepting yet.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    socket: BoundSocket,
}

#[derive(Debug)]
enum BoundSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl SocketListener {
    /// Binds `endpoint`. Stale Unix socket files are replaced; live ones are
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when resolution or binding fails.
    pub fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let socket = match endpoint {
            SocketEndpoint::Tcp { host, port } => BoundSocket::Tcp(bind_tcp(host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => {
                BoundSocket::Unix(super::unix::bind(path.as_std_path())?)
            }
            #[cfg(not(unix))]
            SocketEndpoint::Unix { .. } => {
                return Err(ListenerError::UnsupportedUnix {
                    endpoint: endpoint.to_string(),
                });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            socket,
        })
    }

    /// Endpoint this listener was bound to.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Resolved TCP address, useful when binding port 0.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            BoundSocket::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            BoundSocket::Unix(_) => None,
        }
    }

    /// Starts the accept loop, handing every connection to `handler` on its
    /// own worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the socket cannot be made non-blocking
    /// or the accept thread cannot be spawned.
    pub fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let nonblocking = match &self.socket {
            BoundSocket::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            BoundSocket::Unix(listener) => listener.set_nonblocking(true),
        };
        if let Err(source) = nonblocking {
            self.release();
            return Err(ListenerError::NonBlocking { source });
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("vigild-accept".to_owned())
            .spawn(move || self.accept_loop(&flag, &handler))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            thread: Some(thread),
        })
    }

    fn accept_loop(self, shutdown: &AtomicBool, handler: &Arc<dyn ConnectionHandler>) {
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %self.endpoint,
            "socket listener active"
        );
        let sessions = AtomicUsize::new(0);
        let mut last_error = None::<io::ErrorKind>;
        while !shutdown.load(Ordering::SeqCst) {
            match self.accept() {
                Ok(Some(stream)) => {
                    last_error = None;
                    let id = sessions.fetch_add(1, Ordering::Relaxed);
                    spawn_worker(id, stream, Arc::clone(handler));
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(target: TRANSPORT_TARGET, error = %error, "socket accept error");
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        info!(target: TRANSPORT_TARGET, endpoint = %self.endpoint, "socket listener stopped");
        self.release();
    }

    fn accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match &self.socket {
            BoundSocket::Tcp(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Tcp(stream))
            }),
            #[cfg(unix)]
            BoundSocket::Unix(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Unix(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn release(&self) {
        #[cfg(unix)]
        super::unix::cleanup(&self.endpoint);
    }
}

fn spawn_worker(id: usize, stream: ConnectionStream, handler: Arc<dyn ConnectionHandler>) {
    let spawned = thread::Builder::new()
        .name(format!("vigild-session-{id}"))
        .spawn(move || handler.handle(stream));
    match spawned {
        Ok(_) => debug!(target: TRANSPORT_TARGET, session = id, "session worker started"),
        Err(error) => warn!(
            target: TRANSPORT_TARGET,
            session = id,
            error = %error,
            "failed to spawn session worker; dropping connection"
        ),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

/// Handle to the running accept thread. Dropping it requests shutdown.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop after its current iteration.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit. Session workers already running
    /// finish independently.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the accept thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        self.thread
            .take()
            .map_or(Ok(()), |thread| thread.join().map_err(|_| ListenerError::ThreadPanic))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpStream;
    use std::time::Instant;

    use rstest::{fixture, rstest};

    use super::*;

    struct CountingHandler(Arc<AtomicUsize>);

    impl ConnectionHandler for CountingHandler {
        fn handle(&self, _stream: ConnectionStream) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[fixture]
    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn wait_for(count: &AtomicUsize, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= expected {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[rstest]
    fn tcp_listener_hands_each_connection_to_a_worker(counter: Arc<AtomicUsize>) {
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind tcp listener");
        let addr = listener.local_addr().expect("tcp address");
        let handle = listener
            .start(Arc::new(CountingHandler(Arc::clone(&counter))))
            .expect("start listener");

        TcpStream::connect(addr).expect("first client");
        TcpStream::connect(addr).expect("second client");

        assert!(wait_for(&counter, 2), "expected two sessions");
        handle.shutdown();
        handle.join().expect("join listener");
    }

    #[cfg(unix)]
    #[rstest]
    fn unix_listener_replaces_stale_socket_and_removes_it(counter: Arc<AtomicUsize>) {
        use std::os::unix::net::UnixStream;

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("vigild.sock");
        drop(UnixListener::bind(&path).expect("stale listener"));
        assert!(path.exists());

        let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
        let handle = SocketListener::bind(&endpoint)
            .expect("bind over stale socket")
            .start(Arc::new(CountingHandler(Arc::clone(&counter))))
            .expect("start listener");
        UnixStream::connect(&path).expect("connect client");
        assert!(wait_for(&counter, 1));

        handle.shutdown();
        handle.join().expect("join listener");
        assert!(!path.exists(), "socket file should be removed on shutdown");
    }

    #[cfg(unix)]
    #[test]
    fn unix_listener_refuses_live_socket() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("vigild.sock");
        let _live = UnixListener::bind(&path).expect("live listener");

        let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
        let error = SocketListener::bind(&endpoint).expect_err("socket in use");
        assert!(matches!(error, ListenerError::UnixInUse { .. }));
    }
}
