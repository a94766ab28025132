//! Executes `stash daemon` subcommands.

use std::io::Write;
use std::time::SystemTime;

use stash_config::{Config, RuntimePaths};

use super::error::LifecycleError;
use super::monitoring::{STARTUP_TIMEOUT, read_health, read_pid, wait_for_ready};
use super::shutdown::{signal_daemon, wait_for_shutdown, SHUTDOWN_TIMEOUT};
use super::socket::{ensure_socket_available, socket_is_reachable};
use super::spawning::spawn_daemon;
use super::{LifecycleCommand, LifecycleOutput};

/// Drives daemon lifecycle commands against the real system.
pub(crate) struct SystemLifecycle<'config> {
    config: &'config Config,
}

impl<'config> SystemLifecycle<'config> {
    pub(crate) fn new(config: &'config Config) -> Self {
        Self { config }
    }

    /// Runs one lifecycle command, writing progress to the output handle.
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`] from spawning, signalling, and
    /// monitoring the daemon.
    pub(crate) fn handle<W: Write, E: Write>(
        &self,
        command: LifecycleCommand,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        match command {
            LifecycleCommand::Start => self.start(output),
            LifecycleCommand::Stop => self.stop(output),
            LifecycleCommand::Status => self.status(output),
        }
    }

    fn start<W: Write, E: Write>(
        &self,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        ensure_socket_available(self.config.socket())?;
        self.config.socket().prepare_filesystem()?;
        let paths = RuntimePaths::from_config(self.config)?;

        let started_at = SystemTime::now();
        let mut child = spawn_daemon(self.config, None)?;
        let snapshot = wait_for_ready(&paths, &mut child, started_at, STARTUP_TIMEOUT)?;

        output.stdout_line(format_args!(
            "stashd ready (pid {}) on {}",
            snapshot.pid,
            self.config.socket()
        ))
    }

    fn stop<W: Write, E: Write>(
        &self,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        let paths = RuntimePaths::from_config_readonly(self.config)?;
        let Some(pid) = read_pid(paths.pid_path())? else {
            if socket_is_reachable(self.config.socket())? {
                return Err(LifecycleError::MissingPidWithSocket {
                    path: paths.pid_path().to_path_buf(),
                    socket: self.config.socket().to_string(),
                });
            }
            return output.stderr_line(format_args!("stashd is not running"));
        };

        signal_daemon(pid)?;
        wait_for_shutdown(&paths, self.config.socket(), SHUTDOWN_TIMEOUT)?;
        output.stdout_line(format_args!("stashd (pid {pid}) stopped"))
    }

    fn status<W: Write, E: Write>(
        &self,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        let paths = RuntimePaths::from_config_readonly(self.config)?;
        let pid = read_pid(paths.pid_path())?;
        let health = read_health(paths.health_path())?;
        let reachable = socket_is_reachable(self.config.socket())?;

        match (pid, health) {
            (Some(pid), Some(snapshot)) if reachable => {
                output.stdout_line(format_args!(
                    "stashd is {} (pid {pid}) on {}",
                    snapshot.status,
                    self.config.socket()
                ))
            }
            (Some(pid), _) => output.stderr_line(format_args!(
                "pid file names {pid} but the socket {} is not answering; the daemon may have crashed",
                self.config.socket()
            )),
            (None, _) if reachable => output.stderr_line(format_args!(
                "socket {} answers but no pid file exists; inspect {}",
                self.config.socket(),
                paths.runtime_dir().display()
            )),
            (None, _) => output.stdout_line(format_args!("stashd is not running")),
        }
    }
}
