//! Singleton election and runtime artefact ownership.
//!
//! The guard wins the right to be the daemon by creating the lock file with
//! `create_new`. A loser inspects the recorded pid: a live process means a
//! daemon already runs; a dead one means a crash left stale artefacts, which
//! are removed before retrying the election once.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::Serialize;
use tracing::{info, warn};

use stash_config::RuntimePaths;

use super::PROCESS_TARGET;
use super::errors::LaunchError;

#[derive(Debug)]
pub(super) struct ProcessGuard {
    paths: RuntimePaths,
    _lock: File,
    pid: Option<u32>,
}

impl ProcessGuard {
    pub(super) fn acquire(paths: RuntimePaths) -> Result<Self, LaunchError> {
        let lock = acquire_lock(&paths)?;
        Ok(Self {
            paths,
            _lock: lock,
            pid: None,
        })
    }

    pub(super) fn write_pid(&mut self, pid: u32) -> Result<(), LaunchError> {
        let path = self.paths.pid_path();
        let mut file = open_private(path).map_err(|source| LaunchError::PidWrite {
            path: path.to_path_buf(),
            source,
        })?;
        writeln!(file, "{pid}").map_err(|source| LaunchError::PidWrite {
            path: path.to_path_buf(),
            source,
        })?;
        file.sync_all().map_err(|source| LaunchError::PidWrite {
            path: path.to_path_buf(),
            source,
        })?;
        self.pid = Some(pid);
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }

    pub(super) fn write_health(&self, status: HealthState) -> Result<(), LaunchError> {
        let pid = self.pid.ok_or(LaunchError::MissingPid)?;
        let path = self.paths.health_path();
        let mut file = open_private(path).map_err(|source| LaunchError::HealthWrite {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = HealthSnapshot::new(status, pid)?;
        serde_json::to_writer(&mut file, &snapshot)?;
        file.write_all(b"\n")
            .map_err(|source| LaunchError::HealthWrite {
                path: path.to_path_buf(),
                source,
            })?;
        file.sync_all().map_err(|source| LaunchError::HealthWrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            target: PROCESS_TARGET,
            status = snapshot.status,
            file = %path.display(),
            "health snapshot updated"
        );
        Ok(())
    }

    pub(super) fn paths(&self) -> &RuntimePaths {
        &self.paths
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        for path in [
            self.paths.lock_path(),
            self.paths.pid_path(),
            self.paths.health_path(),
        ] {
            if let Err(error) = fs::remove_file(path)
                && error.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    target: PROCESS_TARGET,
                    file = %path.display(),
                    error = %error,
                    "failed to remove runtime artefact"
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum HealthState {
    Starting,
    Ready,
    Stopping,
}

impl HealthState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthSnapshot<'a> {
    status: &'a str,
    pid: u32,
    timestamp: u64,
}

impl HealthSnapshot<'_> {
    fn new(state: HealthState, pid: u32) -> Result<Self, LaunchError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|source| LaunchError::Clock { source })?
            .as_secs();
        Ok(Self {
            status: state.as_str(),
            pid,
            timestamp,
        })
    }
}

fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

fn acquire_lock(paths: &RuntimePaths) -> Result<File, LaunchError> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(paths.lock_path())
    {
        Ok(file) => {
            info!(
                target: PROCESS_TARGET,
                file = %paths.lock_path().display(),
                "acquired daemon lock"
            );
            Ok(file)
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => handle_existing_lock(paths),
        Err(source) => Err(LaunchError::LockCreate {
            path: paths.lock_path().to_path_buf(),
            source,
        }),
    }
}

fn handle_existing_lock(paths: &RuntimePaths) -> Result<File, LaunchError> {
    if let Some(pid) = read_pid(paths.pid_path())
        && pid != 0
    {
        match process_alive(pid) {
            Ok(true) => {
                info!(
                    target: PROCESS_TARGET,
                    pid,
                    "refusing to start: existing daemon alive"
                );
                return Err(LaunchError::AlreadyRunning { pid });
            }
            Ok(false) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid,
                    "existing daemon not detected; cleaning stale files"
                );
            }
            Err(error) => return Err(error),
        }
    }
    remove_stale(paths.lock_path())?;
    remove_stale(paths.pid_path())?;
    remove_stale(paths.health_path())?;
    acquire_lock(paths)
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}

fn remove_stale(path: &Path) -> Result<(), LaunchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LaunchError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn process_alive(pid: u32) -> Result<bool, LaunchError> {
    if pid == 0 {
        return Ok(false);
    }
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => Ok(true),
        Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH | Errno::ECHILD) => Ok(false),
        Err(errno) => Err(LaunchError::CheckProcess { pid, source: errno }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_config::{Config, SocketPath};

    fn runtime_paths(dir: &tempfile::TempDir) -> RuntimePaths {
        let socket = dir.path().join("stashd.sock");
        let config = Config {
            socket: SocketPath::new(socket.to_str().expect("utf8 path")),
            ..Config::default()
        };
        RuntimePaths::from_config(&config).expect("runtime paths")
    }

    #[test]
    fn guard_owns_lock_and_cleans_up_on_drop() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = runtime_paths(&dir);
        {
            let mut guard = ProcessGuard::acquire(paths.clone()).expect("acquire");
            guard.write_pid(std::process::id()).expect("write pid");
            guard.write_health(HealthState::Ready).expect("write health");
            assert!(paths.lock_path().exists());
            assert!(paths.pid_path().exists());
            assert!(paths.health_path().exists());
        }
        assert!(!paths.lock_path().exists());
        assert!(!paths.pid_path().exists());
        assert!(!paths.health_path().exists());
    }

    #[test]
    fn second_acquire_reports_live_daemon() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = runtime_paths(&dir);
        let mut guard = ProcessGuard::acquire(paths.clone()).expect("acquire");
        guard.write_pid(std::process::id()).expect("write pid");

        let error = ProcessGuard::acquire(paths).expect_err("second acquire");
        assert!(matches!(error, LaunchError::AlreadyRunning { .. }));
    }

    #[test]
    fn stale_lock_from_dead_process_is_reclaimed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = runtime_paths(&dir);
        fs::write(paths.lock_path(), b"").expect("stale lock");
        // Pid max is capped well below this value on Linux, so the process
        // cannot exist.
        fs::write(paths.pid_path(), b"4000000").expect("stale pid");

        let guard = ProcessGuard::acquire(paths.clone()).expect("reclaim");
        assert!(paths.lock_path().exists());
        drop(guard);
    }

    #[test]
    fn health_requires_pid_first() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = runtime_paths(&dir);
        let guard = ProcessGuard::acquire(paths).expect("acquire");
        let error = guard
            .write_health(HealthState::Starting)
            .expect_err("missing pid");
        assert!(matches!(error, LaunchError::MissingPid));
    }

    #[test]
    fn health_snapshot_is_json_with_status_and_pid() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = runtime_paths(&dir);
        let mut guard = ProcessGuard::acquire(paths.clone()).expect("acquire");
        guard.write_pid(1234).expect("write pid");
        guard.write_health(HealthState::Ready).expect("write health");

        let content = fs::read_to_string(paths.health_path()).expect("read health");
        let snapshot: serde_json::Value =
            serde_json::from_str(content.trim()).expect("health json");
        assert_eq!(snapshot["status"], "ready");
        assert_eq!(snapshot["pid"], 1234);
        assert!(snapshot["timestamp"].as_u64().expect("timestamp") > 0);
    }
}
