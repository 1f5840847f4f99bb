//! Accepted connection streams.

use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the listener.
#[derive(Debug)]
pub enum ConnectionStream {
    /// TCP client. Never treated as the daemon owner.
    Tcp(TcpStream),
    /// Unix domain socket client.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Returns true when the peer runs as the daemon's effective user.
    #[must_use]
    pub fn peer_is_owner(&self) -> bool {
        match self {
            Self::Tcp(_) => false,
            #[cfg(unix)]
            Self::Unix(stream) => super::unix::peer_is_owner(stream),
        }
    }

    /// Clones the underlying socket so reads and writes can be buffered
    /// independently.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the descriptor cannot be duplicated.
    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Serves one accepted connection until the peer disconnects.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should not panic.
    fn handle(&self, stream: ConnectionStream);
}
