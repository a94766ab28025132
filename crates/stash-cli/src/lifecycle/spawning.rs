//! Daemon process spawning.

use std::env;
use std::ffi::{OsStr, OsString};
use std::process::{Child, Command, Stdio};

use stash_config::Config;

use super::error::LifecycleError;

const DAEMON_BIN_ENV_VAR: &str = "STASHD_BIN";

/// Spawns the daemon process, forwarding the resolved configuration as
/// command-line flags so the child agrees on the socket location.
///
/// The binary is taken from the override when given, then `STASHD_BIN`,
/// then the plain `stashd` name on `PATH`.
pub(super) fn spawn_daemon(
    config: &Config,
    binary_override: Option<&OsStr>,
) -> Result<Child, LifecycleError> {
    let binary = resolve_daemon_binary(binary_override);
    let mut command = Command::new(&binary);
    command
        .arg("--socket")
        .arg(config.socket().as_str())
        .arg("--log-filter")
        .arg(config.log_filter())
        .arg("--log-format")
        .arg(config.log_format().to_string())
        .arg("--idle-timeout")
        .arg(config.idle_timeout().to_string());
    command.stdin(Stdio::null());
    command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    command
        .spawn()
        .map_err(|source| LifecycleError::LaunchDaemon { binary, source })
}

fn resolve_daemon_binary(binary_override: Option<&OsStr>) -> OsString {
    binary_override
        .map(OsString::from)
        .or_else(|| env::var_os(DAEMON_BIN_ENV_VAR))
        .unwrap_or_else(|| OsString::from("stashd"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_uses_binary_override() {
        let config = Config::default();
        let error = spawn_daemon(&config, Some(OsStr::new("/nonexistent/stashd")))
            .expect_err("missing binary");
        match error {
            LifecycleError::LaunchDaemon { binary, .. } => {
                assert_eq!(binary, OsString::from("/nonexistent/stashd"));
            }
            other => panic!("expected LaunchDaemon, got: {other:?}"),
        }
    }

    #[test]
    fn resolve_falls_back_to_plain_name() {
        let resolved = resolve_daemon_binary(None);
        if let Some(from_env) = env::var_os(DAEMON_BIN_ENV_VAR) {
            assert_eq!(resolved, from_env);
        } else {
            assert_eq!(resolved, OsString::from("stashd"));
        }
    }
}
