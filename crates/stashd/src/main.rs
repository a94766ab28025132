//! Binary entrypoint for the `stashd` daemon.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use stash_config::{Config, ConfigOverrides, IdleTimeout, LogFormat, SocketPath};
use stashd::{LaunchError, LaunchMode, initialise_telemetry, run_daemon};

/// Ephemeral JSON document store daemon.
#[derive(Parser, Debug)]
#[command(name = "stashd", version)]
struct Args {
    /// Path of the Unix socket to listen on.
    #[arg(long, value_name = "PATH")]
    socket: Option<String>,
    /// Log filter expression (tracing `EnvFilter` syntax).
    #[arg(long, value_name = "FILTER")]
    log_filter: Option<String>,
    /// Log output format.
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
    /// Inactivity window before the daemon exits, e.g. `90s` or `1m30s`.
    #[arg(long, value_name = "DURATION")]
    idle_timeout: Option<IdleTimeout>,
    /// Stay attached to the terminal instead of daemonising.
    #[arg(long)]
    foreground: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            socket: self.socket.as_deref().map(SocketPath::from),
            log_filter: self.log_filter.clone(),
            log_format: self.log_format,
            idle_timeout: self.idle_timeout,
        }
    }

    fn mode(&self) -> LaunchMode {
        if self.foreground {
            LaunchMode::Foreground
        } else {
            LaunchMode::detect()
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match Config::load(&args.overrides()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("stashd: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = initialise_telemetry(&config) {
        eprintln!("stashd: {error}");
        return ExitCode::FAILURE;
    }
    match run_daemon(&config, args.mode()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(LaunchError::AlreadyRunning { pid }) => {
            error!(pid, "daemon already running");
            ExitCode::FAILURE
        }
        Err(error) => {
            error!(error = %error, "daemon failed");
            ExitCode::FAILURE
        }
    }
}
