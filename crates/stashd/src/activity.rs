//! Idle tracking for the lazily started daemon.
//!
//! The daemon exits once no request has been served for the configured idle
//! window. The monitor records the instant of the most recent activity and
//! the number of requests currently in flight; a request in flight always
//! counts as activity, so a slow request can never be interrupted by the
//! idle watcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use crate::process::ShutdownCause;

const ACTIVITY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::activity");

/// Poll interval for the idle watcher thread.
const IDLE_POLL: Duration = Duration::from_secs(2);

/// Shared record of daemon activity.
#[derive(Debug)]
pub struct ActivityMonitor {
    started: Instant,
    last_activity_millis: AtomicU64,
    in_flight: AtomicUsize,
}

impl ActivityMonitor {
    /// Builds a monitor whose idle clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last_activity_millis: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Marks the current instant as the most recent activity.
    pub fn touch(&self) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_activity_millis.store(elapsed, Ordering::SeqCst);
    }

    /// Registers a request as in flight and returns a guard that releases
    /// the slot when dropped. Both entry and exit refresh the idle clock.
    pub fn begin_request(self: &Arc<Self>) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        ActivityGuard {
            monitor: Arc::clone(self),
        }
    }

    /// Number of requests currently being served.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Time elapsed since the last recorded activity, or since start when
    /// nothing has been recorded yet.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_millis.load(Ordering::SeqCst));
        self.started.elapsed().saturating_sub(last)
    }

    /// Whether the daemon has been idle for at least `timeout` with no
    /// request in flight.
    #[must_use]
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0 && self.idle_for() >= timeout
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for a request in flight.
#[derive(Debug)]
pub struct ActivityGuard {
    monitor: Arc<ActivityMonitor>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.monitor.touch();
        self.monitor.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Spawns the watcher thread that reports idleness over `shutdown_tx`.
///
/// The thread wakes every couple of seconds and sends
/// [`ShutdownCause::Idle`] once the idle condition holds. The thread is not
/// joined on the signal path; it dies with the process.
pub(crate) fn spawn_idle_watcher(
    monitor: Arc<ActivityMonitor>,
    timeout: Duration,
    shutdown_tx: Sender<ShutdownCause>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            thread::sleep(IDLE_POLL.min(timeout));
            if monitor.is_idle(timeout) {
                info!(
                    target: ACTIVITY_TARGET,
                    idle_seconds = monitor.idle_for().as_secs(),
                    "idle timeout reached"
                );
                let _ = shutdown_tx.send(ShutdownCause::Idle);
                return;
            }
        }
    })
}
