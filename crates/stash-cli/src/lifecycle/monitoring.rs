//! Daemon health monitoring.
//!
//! Readiness is observed through the health snapshot file the daemon writes
//! next to its socket. Because the daemon forks away from the spawned
//! process, readiness is keyed on the snapshot's status and freshness
//! rather than on the child pid.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Child;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use stash_config::{Config, RuntimePaths};

use super::error::LifecycleError;
use super::spawning::spawn_daemon;

pub(super) const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(200);
/// How long to keep watching for a ready daemon after the spawned child
/// exits with a failure, covering the window where a concurrent starter won
/// the singleton election but has not yet published its snapshot.
const FAILURE_GRACE: Duration = Duration::from_secs(2);

/// Operational state the daemon reports through its health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DaemonStatus {
    Starting,
    Ready,
    Stopping,
}

impl std::fmt::Display for DaemonStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => formatter.write_str("starting"),
            Self::Ready => formatter.write_str("ready"),
            Self::Stopping => formatter.write_str("stopping"),
        }
    }
}

/// Health snapshot data read from the daemon's health file.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct HealthSnapshot {
    pub(crate) status: DaemonStatus,
    pub(crate) pid: u32,
    pub(crate) timestamp: u64,
}

/// Reads the health snapshot, if present.
///
/// # Errors
///
/// Returns [`LifecycleError::ReadHealth`] for IO failures other than a
/// missing file and [`LifecycleError::ParseHealth`] for invalid JSON.
pub(super) fn read_health(path: &Path) -> Result<Option<HealthSnapshot>, LifecycleError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LifecycleError::ReadHealth {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(content.trim())
        .map(Some)
        .map_err(|source| LifecycleError::ParseHealth {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads the daemon pid file, if present and non-empty.
///
/// # Errors
///
/// Returns [`LifecycleError::ReadPid`] for IO failures other than a
/// missing file and [`LifecycleError::ParsePid`] for non-numeric content.
pub(super) fn read_pid(path: &Path) -> Result<Option<u32>, LifecycleError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LifecycleError::ReadPid {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|source| LifecycleError::ParsePid {
            path: path.to_path_buf(),
            source,
        })
}

/// Waits for the daemon to publish a fresh `ready` snapshot.
///
/// The spawned process exits once it has forked into the background, so a
/// clean child exit is expected. A failed exit does not abort the wait
/// outright: when two clients race to start the daemon, the loser exits
/// non-zero while the winner may still be coming up, so the watch continues
/// for a short grace window and succeeds if a fresh `ready` snapshot
/// appears. Snapshots older than `started_at` are ignored as leftovers from
/// a previous run.
///
/// # Errors
///
/// Returns [`LifecycleError::StartupFailed`] when the child exits with an
/// error, [`LifecycleError::StartupAborted`] when the daemon reports
/// `stopping`, and [`LifecycleError::StartupTimeout`] when the deadline
/// passes.
pub(super) fn wait_for_ready(
    paths: &RuntimePaths,
    child: &mut Child,
    started_at: SystemTime,
    timeout: Duration,
) -> Result<HealthSnapshot, LifecycleError> {
    let mut deadline = Instant::now() + timeout;
    let mut child_failure: Option<Option<i32>> = None;
    while Instant::now() < deadline {
        if let Some(snapshot) = read_health(paths.health_path())?
            && snapshot_is_recent(&snapshot, started_at)?
        {
            match snapshot.status {
                DaemonStatus::Ready => return Ok(snapshot),
                DaemonStatus::Stopping => {
                    return Err(LifecycleError::StartupAborted {
                        path: paths.health_path().to_path_buf(),
                    });
                }
                DaemonStatus::Starting => {}
            }
        }
        if child_failure.is_none()
            && let Some(status) = child
                .try_wait()
                .map_err(|source| LifecycleError::MonitorChild { source })?
            && !status.success()
        {
            // The loser of a start race exits non-zero while the winner may
            // still be starting up. Keep watching the health file briefly;
            // the failure is only reported once no winner appears.
            child_failure = Some(status.code());
            deadline = deadline.min(Instant::now() + FAILURE_GRACE);
        }
        thread::sleep(POLL_INTERVAL);
    }
    match child_failure {
        Some(exit_status) => Err(LifecycleError::StartupFailed { exit_status }),
        None => Err(LifecycleError::StartupTimeout {
            health_path: paths.health_path().to_path_buf(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Whether the snapshot was written at or after `started_at`.
///
/// The comparison truncates to whole seconds because the snapshot carries
/// no sub-second precision.
pub(super) fn snapshot_is_recent(
    snapshot: &HealthSnapshot,
    started_at: SystemTime,
) -> Result<bool, LifecycleError> {
    let started_secs = started_at
        .duration_since(UNIX_EPOCH)
        .map_err(|source| LifecycleError::MonitorChild {
            source: io::Error::new(io::ErrorKind::InvalidData, source),
        })?
        .as_secs();
    Ok(snapshot.timestamp >= started_secs)
}

/// Starts the daemon implicitly after a data command found no listener.
///
/// # Errors
///
/// Propagates spawn and readiness failures as [`LifecycleError`].
pub(crate) fn try_auto_start_daemon(
    config: &Config,
    binary_override: Option<&OsStr>,
) -> Result<(), LifecycleError> {
    config.socket().prepare_filesystem()?;
    let paths = RuntimePaths::from_config(config)?;
    let started_at = SystemTime::now();
    let mut child = spawn_daemon(config, binary_override)?;
    wait_for_ready(&paths, &mut child, started_at, STARTUP_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::process::Command;

    use stash_config::SocketPath;

    use super::*;

    fn paths_in(dir: &tempfile::TempDir) -> RuntimePaths {
        let socket = dir.path().join("stashd.sock");
        let config = Config {
            socket: SocketPath::new(socket.to_str().expect("utf8 path")),
            ..Config::default()
        };
        RuntimePaths::from_config(&config).expect("runtime paths")
    }

    fn write_snapshot(paths: &RuntimePaths, status: &str, timestamp: u64) {
        let body = format!(r#"{{"status":"{status}","pid":4242,"timestamp":{timestamp}}}"#);
        fs::write(paths.health_path(), body).expect("write snapshot");
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_secs()
    }

    #[test]
    fn missing_health_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        assert!(read_health(paths.health_path()).expect("read").is_none());
    }

    #[test]
    fn parses_ready_snapshot() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        write_snapshot(&paths, "ready", 1_700_000_000);
        let snapshot = read_health(paths.health_path())
            .expect("read")
            .expect("snapshot");
        assert_eq!(snapshot.status, DaemonStatus::Ready);
        assert_eq!(snapshot.pid, 4242);
    }

    #[test]
    fn invalid_snapshot_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        fs::write(paths.health_path(), b"{half a snapshot").expect("write");
        let error = read_health(paths.health_path()).expect_err("bad json");
        assert!(matches!(error, LifecycleError::ParseHealth { .. }));
    }

    #[test]
    fn stale_snapshot_is_not_recent() {
        let snapshot = HealthSnapshot {
            status: DaemonStatus::Ready,
            pid: 1,
            timestamp: now_secs() - 120,
        };
        let recent = snapshot_is_recent(&snapshot, SystemTime::now()).expect("compare");
        assert!(!recent);
    }

    #[test]
    fn pid_file_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        fs::write(paths.pid_path(), b"3141\n").expect("write pid");
        assert_eq!(read_pid(paths.pid_path()).expect("read"), Some(3141));
    }

    #[test]
    fn losing_start_race_falls_back_to_the_winner() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        let started_at = SystemTime::now();
        write_snapshot(&paths, "ready", now_secs());
        let mut child = Command::new("false").spawn().expect("spawn losing child");

        let snapshot = wait_for_ready(&paths, &mut child, started_at, Duration::from_secs(5))
            .expect("fall back to the running daemon");
        assert_eq!(snapshot.status, DaemonStatus::Ready);
        let _ = child.wait();
    }

    #[test]
    fn winner_publishing_after_loser_exit_is_still_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        let started_at = SystemTime::now();
        let mut child = Command::new("false").spawn().expect("spawn losing child");
        let writer = {
            let health = paths.health_path().to_path_buf();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(400));
                let body =
                    format!(r#"{{"status":"ready","pid":4242,"timestamp":{}}}"#, now_secs());
                fs::write(health, body).expect("write snapshot");
            })
        };

        let snapshot = wait_for_ready(&paths, &mut child, started_at, Duration::from_secs(5))
            .expect("winner found within the grace window");
        assert_eq!(snapshot.status, DaemonStatus::Ready);
        writer.join().expect("writer thread");
    }

    #[test]
    fn failed_child_without_a_running_daemon_reports_startup_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        let mut child = Command::new("false").spawn().expect("spawn failing child");

        let error = wait_for_ready(
            &paths,
            &mut child,
            SystemTime::now(),
            Duration::from_millis(600),
        )
        .expect_err("no daemon ever appears");
        assert!(matches!(error, LifecycleError::StartupFailed { .. }));
    }

    #[test]
    fn blank_pid_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = paths_in(&dir);
        fs::write(paths.pid_path(), b"  \n").expect("write pid");
        assert!(read_pid(paths.pid_path()).expect("read").is_none());
    }
}
