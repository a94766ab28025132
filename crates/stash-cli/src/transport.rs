//! Socket transport helpers for the `stash` client.
//!
//! Establishes the Unix socket connection with a bounded connect timeout so
//! a wedged daemon cannot hang the client indefinitely.

use std::io;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use socket2::{Domain, SockAddr, Socket, Type};

use stash_config::SocketPath;

use crate::errors::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to the daemon socket.
///
/// # Errors
///
/// Returns [`AppError::Connect`] carrying the socket path and the
/// underlying IO error.
pub(crate) fn connect(socket: &SocketPath) -> Result<UnixStream, AppError> {
    connect_unix(socket.as_str()).map_err(|source| AppError::Connect {
        socket: socket.to_string(),
        source,
    })
}

fn connect_unix(path: &str) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixListener;

    use super::*;

    #[test]
    fn connects_to_listening_socket() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stashd.sock");
        let _listener = UnixListener::bind(&path).expect("bind listener");
        let socket = SocketPath::new(path.to_str().expect("utf8 path"));
        connect(&socket).expect("connect");
    }

    #[test]
    fn missing_socket_reports_connect_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.sock");
        let socket = SocketPath::new(path.to_str().expect("utf8 path"));
        let error = connect(&socket).expect_err("no listener");
        assert!(error.daemon_not_running(), "unexpected error: {error}");
    }
}
