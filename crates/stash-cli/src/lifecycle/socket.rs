//! Socket connectivity probes.
//!
//! Used to decide whether a daemon is listening before starting one and to
//! confirm a stopped daemon has released its socket.

use std::io;
use std::time::Duration;

use socket2::{Domain, SockAddr, Socket, Type};

use stash_config::SocketPath;

use super::error::LifecycleError;

const SOCKET_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ensures the socket is not currently in use.
pub(super) fn ensure_socket_available(socket: &SocketPath) -> Result<(), LifecycleError> {
    if socket_is_reachable(socket)? {
        return Err(LifecycleError::SocketInUse {
            socket: socket.to_string(),
        });
    }
    Ok(())
}

/// Checks whether a process answers on the socket.
pub(super) fn socket_is_reachable(socket: &SocketPath) -> Result<bool, LifecycleError> {
    match try_connect(socket.as_str()) {
        Ok(()) => Ok(true),
        Err(error) if socket_is_free(&error) => Ok(false),
        Err(source) => Err(LifecycleError::SocketProbe {
            socket: socket.to_string(),
            source,
        }),
    }
}

fn try_connect(path: &str) -> io::Result<()> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, SOCKET_PROBE_TIMEOUT)
}

/// Whether the error indicates no process is listening.
///
/// `ConnectionReset` is deliberately excluded: it means a peer accepted and
/// then closed the connection, so something is listening.
fn socket_is_free(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotFound
            | io::ErrorKind::AddrNotAvailable
    )
}
