//! Unix domain socket helpers: stale socket cleanup and peer credentials.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use tracing::warn;
use vigil_config::SocketEndpoint;

use super::{ListenerError, TRANSPORT_TARGET};

/// Binds `path`, replacing a stale socket file but never a live one.
pub(super) fn bind(path: &Path) -> Result<UnixListener, ListenerError> {
    let display = || path.display().to_string();
    if path.exists() {
        let metadata = fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
            path: display(),
            source,
        })?;
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket { path: display() });
        }
        match UnixStream::connect(path) {
            Ok(_live) => return Err(ListenerError::UnixInUse { path: display() }),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                    path: display(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(ListenerError::UnixConnect {
                    path: display(),
                    source,
                });
            }
        }
    }
    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: display(),
        source,
    })
}

/// Removes the socket file of a Unix endpoint, if any.
pub(super) fn cleanup(endpoint: &SocketEndpoint) {
    let Some(path) = endpoint.unix_path() else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        );
    }
}

/// Compares the peer's uid with the daemon's effective uid.
///
/// A peer whose credentials cannot be read is not an owner.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(super) fn peer_is_owner(stream: &UnixStream) -> bool {
    use nix::sys::socket::{getsockopt, sockopt::PeerCredentials};
    use nix::unistd::geteuid;

    match getsockopt(stream, PeerCredentials) {
        Ok(credentials) => credentials.uid() == geteuid().as_raw(),
        Err(error) => {
            warn!(
                target: TRANSPORT_TARGET,
                error = %error,
                "failed to read peer credentials"
            );
            false
        }
    }
}

/// Local peers share the `0700` socket directory with the daemon.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(super) fn peer_is_owner(_stream: &UnixStream) -> bool {
    true
}
