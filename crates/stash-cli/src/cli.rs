//! Command-line surface of the `stash` client.

use clap::{Args, Parser, Subcommand};

use stash_config::{ConfigOverrides, IdleTimeout, LogFormat, SocketPath};

use crate::lifecycle::LifecycleCommand;

/// Ephemeral JSON document store client.
#[derive(Debug, Parser)]
#[command(name = "stash", version, about = "Share JSON documents between shell commands")]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) globals: GlobalArgs,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct GlobalArgs {
    /// Path of the daemon socket.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) socket: Option<String>,
    /// Log filter forwarded to an auto-started daemon.
    #[arg(long, global = true, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Log format forwarded to an auto-started daemon.
    #[arg(long, global = true, value_name = "FORMAT")]
    pub(crate) log_format: Option<LogFormat>,
    /// Idle timeout forwarded to an auto-started daemon, e.g. `90s` or `1h30m`.
    #[arg(long, global = true, value_name = "DURATION")]
    pub(crate) idle_timeout: Option<IdleTimeout>,
}

impl GlobalArgs {
    pub(crate) fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            socket: self.socket.as_deref().map(SocketPath::from),
            log_filter: self.log_filter.clone(),
            log_format: self.log_format,
            idle_timeout: self.idle_timeout,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Store the JSON document read from stdin.
    ///
    /// Without an address a new document is created and its key printed.
    /// With an address the target document or location is overwritten.
    Set {
        /// Target `KEY` or `KEY.path` to overwrite.
        #[arg(value_name = "ADDRESS")]
        addr: Option<String>,
    },
    /// Print the value at an address.
    Get {
        /// Source `KEY` or `KEY.path`.
        #[arg(value_name = "ADDRESS")]
        addr: String,
        /// Print strings unquoted and composites as compact JSON.
        #[arg(long)]
        raw: bool,
    },
    /// List the members of an object or array, one label per line.
    Range {
        /// Source `KEY` or `KEY.path`.
        #[arg(value_name = "ADDRESS")]
        addr: String,
    },
    /// Control the background daemon.
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Debug, Subcommand, Clone, Copy)]
pub(crate) enum DaemonAction {
    /// Start the daemon explicitly.
    Start,
    /// Stop a running daemon.
    Stop,
    /// Report whether the daemon is running.
    Status,
}

impl From<DaemonAction> for LifecycleCommand {
    fn from(action: DaemonAction) -> Self {
        match action {
            DaemonAction::Start => Self::Start,
            DaemonAction::Stop => Self::Stop,
            DaemonAction::Status => Self::Status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse args")
    }

    #[test]
    fn set_without_address_creates() {
        let cli = parse(&["stash", "set"]);
        assert!(matches!(cli.command, Command::Set { addr: None }));
    }

    #[test]
    fn get_accepts_raw_flag() {
        let cli = parse(&["stash", "get", "--raw", "Ab3xYz01Qr9K.name"]);
        match cli.command {
            Command::Get { addr, raw } => {
                assert_eq!(addr, "Ab3xYz01Qr9K.name");
                assert!(raw);
            }
            other => panic!("expected get, got: {other:?}"),
        }
    }

    #[test]
    fn globals_apply_after_the_subcommand() {
        let cli = parse(&["stash", "range", "k1", "--socket", "/tmp/s/stashd.sock"]);
        let overrides = cli.globals.overrides();
        assert_eq!(
            overrides.socket.expect("socket override").as_str(),
            "/tmp/s/stashd.sock"
        );
    }

    #[test]
    fn idle_timeout_uses_duration_grammar() {
        let cli = parse(&["stash", "daemon", "start", "--idle-timeout", "1h30m"]);
        let timeout = cli.globals.idle_timeout.expect("timeout");
        assert_eq!(timeout.as_duration().as_secs(), 5400);
    }

    #[test]
    fn missing_subcommand_is_a_usage_error() {
        assert!(Cli::try_parse_from(["stash"]).is_err());
    }
}
