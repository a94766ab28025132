//! Shutdown coordination for the daemon.
//!
//! Two sources can end the daemon: a termination signal and the idle
//! watcher. Both report over the same channel, so the supervisor blocks on
//! a single receiver and acts on whichever cause arrives first.

use std::io;
use std::sync::mpsc::Sender;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Why the daemon is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A termination signal arrived.
    Signal(i32),
    /// The idle timeout elapsed with no request in flight.
    Idle,
}

/// Errors reported while installing shutdown listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
}

/// Spawns a thread forwarding termination signals to `shutdown_tx`.
///
/// # Errors
///
/// Returns [`ShutdownError::Install`] when the signal iterator cannot be
/// registered.
pub(super) fn spawn_signal_listener(
    shutdown_tx: Sender<ShutdownCause>,
) -> Result<(), ShutdownError> {
    let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
        .map_err(|source| ShutdownError::Install { source })?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal,
                "shutdown signal received"
            );
            let _ = shutdown_tx.send(ShutdownCause::Signal(signal));
        }
    });
    Ok(())
}
