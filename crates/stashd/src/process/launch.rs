//! Supervises daemon launch sequencing and runtime orchestration.

use std::env;
use std::ffi::OsStr;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use daemonize_me::Daemon;
use tracing::{info, warn};

use stash_config::{Config, RuntimePaths};
use stash_store::DocumentStore;

use crate::activity::{ActivityMonitor, spawn_idle_watcher};
use crate::dispatch::DispatchConnectionHandler;
use crate::transport::SocketListener;

use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::shutdown::{ShutdownCause, spawn_signal_listener};
use super::{FOREGROUND_ENV_VAR, PROCESS_TARGET};

/// How long shutdown waits for in-flight requests to finish before the
/// process exits anyway.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(25);

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal, for debugging and tests.
    Foreground,
}

impl LaunchMode {
    /// Detects the launch mode from the `STASHD_FOREGROUND` environment
    /// variable; unset means background.
    #[must_use]
    pub fn detect() -> Self {
        if env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when another daemon already owns the socket,
/// when runtime artefacts cannot be prepared, or when the listener fails.
pub fn run_daemon(config: &Config, mode: LaunchMode) -> Result<(), LaunchError> {
    run_daemon_with(config, mode, detach_process)
}

fn run_daemon_with(
    config: &Config,
    mode: LaunchMode,
    detach: impl Fn(&RuntimePaths) -> Result<(), LaunchError>,
) -> Result<(), LaunchError> {
    info!(
        target: PROCESS_TARGET,
        ?mode,
        socket = %config.socket(),
        idle_timeout = ?config.idle_timeout().as_duration(),
        "starting daemon runtime"
    );
    config.socket().prepare_filesystem()?;
    let runtime_paths = RuntimePaths::from_config(config)?;
    let mut guard = ProcessGuard::acquire(runtime_paths)?;
    if matches!(mode, LaunchMode::Background) {
        detach(guard.paths())?;
    }
    guard.write_pid(std::process::id())?;
    guard.write_health(HealthState::Starting)?;

    let listener = SocketListener::bind(config.socket())?;
    let store = Arc::new(DocumentStore::new());
    let activity = Arc::new(ActivityMonitor::new());
    let handler = Arc::new(DispatchConnectionHandler::new(
        Arc::clone(&store),
        Arc::clone(&activity),
    ));
    let listener_handle = listener.start(handler)?;
    guard.write_health(HealthState::Ready)?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    spawn_signal_listener(shutdown_tx.clone())?;
    let _watcher = spawn_idle_watcher(
        Arc::clone(&activity),
        config.idle_timeout().as_duration(),
        shutdown_tx,
    );

    let cause = shutdown_rx.recv().unwrap_or(ShutdownCause::Idle);
    info!(
        target: PROCESS_TARGET,
        cause = ?cause,
        entries = store.len(),
        "shutting down"
    );
    guard.write_health(HealthState::Stopping)?;
    listener_handle.shutdown();
    listener_handle.join()?;
    drain_in_flight(&activity, DRAIN_TIMEOUT);
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

/// Detaches into the background, leaving the parent to exit cleanly.
fn detach_process(paths: &RuntimePaths) -> Result<(), LaunchError> {
    info!(
        target: PROCESS_TARGET,
        runtime = %paths.runtime_dir().display(),
        "detaching into background"
    );
    Daemon::new()
        .work_dir(paths.runtime_dir())
        .name(OsStr::new(env!("CARGO_PKG_NAME")))
        .start()
        .map_err(|source| LaunchError::Daemonize { source })
}

/// Waits for connection handlers still serving a request to finish.
///
/// A request accepted just before the listener stopped must run to
/// completion so its client still receives an exit message. The wait is
/// bounded; a handler wedged past the deadline is abandoned.
fn drain_in_flight(activity: &ActivityMonitor, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while activity.in_flight() > 0 {
        if Instant::now() >= deadline {
            warn!(
                target: PROCESS_TARGET,
                in_flight = activity.in_flight(),
                "shutdown deadline passed with requests still in flight"
            );
            return;
        }
        thread::sleep(DRAIN_POLL);
    }
}
