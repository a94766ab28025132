//! Orderly daemon shutdown.
//!
//! Stop requests deliver `SIGTERM` and then wait for the daemon to remove
//! its pid file and release the socket.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use stash_config::{RuntimePaths, SocketPath};

use super::error::LifecycleError;
use super::monitoring::read_pid;
use super::socket::socket_is_reachable;

pub(super) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Sends `SIGTERM` to the daemon process.
///
/// # Errors
///
/// Returns [`LifecycleError::SignalFailed`] when the kernel rejects the
/// signal, for example because the process has already exited.
pub(super) fn signal_daemon(pid: u32) -> Result<(), LifecycleError> {
    // SAFETY: kill with a valid signal number has no memory-safety
    // preconditions; an invalid pid is reported through errno.
    let outcome = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if outcome == 0 {
        return Ok(());
    }
    Err(LifecycleError::SignalFailed {
        pid,
        source: io::Error::last_os_error(),
    })
}

/// Waits for the daemon to finish shutting down.
///
/// Completion is observed as the pid file disappearing and the socket no
/// longer answering connections.
///
/// # Errors
///
/// Returns [`LifecycleError::ShutdownTimeout`] when the deadline passes
/// with the daemon still running.
pub(super) fn wait_for_shutdown(
    paths: &RuntimePaths,
    socket: &SocketPath,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let deadline = Instant::now() + timeout;
    loop {
        if read_pid(paths.pid_path())?.is_none() && !socket_is_reachable(socket)? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(LifecycleError::ShutdownTimeout {
                pid_path: paths.pid_path().to_path_buf(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}
