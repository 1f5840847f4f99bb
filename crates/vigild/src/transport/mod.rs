//! Socket transport for client sessions.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread. Each accepted connection gets its own worker thread
//! running a [`ConnectionHandler`]; the daemon installs a
//! [`SessionHandler`] that feeds newline-framed requests to the dispatcher.

mod errors;
mod listener;
mod session;
mod stream;
#[cfg(unix)]
mod unix;

pub use self::errors::ListenerError;
pub use self::listener::{ListenerHandle, SocketListener};
pub use self::session::SessionHandler;
pub use self::stream::{ConnectionHandler, ConnectionStream};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
