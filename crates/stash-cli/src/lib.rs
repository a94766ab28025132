//! Client for the `stashd` ephemeral JSON document store.
//!
//! Each invocation resolves configuration, opens one connection to the
//! daemon socket, sends a single JSONL request, and forwards the daemon's
//! response streams to its own stdout and stderr. When no daemon answers, a
//! data command starts one transparently and retries once.

mod address;
mod cli;
mod command;
mod daemon_output;
mod errors;
mod lifecycle;
mod transport;

use std::ffi::OsString;
use std::io::{Read, Write};
use std::net::Shutdown;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;

use stash_config::Config;

use crate::address::Address;
use crate::cli::{Cli, Command};
use crate::command::CommandRequest;
use crate::daemon_output::forward_daemon_messages;
use crate::errors::AppError;
use crate::lifecycle::{LifecycleOutput, SystemLifecycle, try_auto_start_daemon};

pub use crate::errors::AppError as Error;
pub use crate::lifecycle::LifecycleError;

/// Runs the client with the given arguments and output streams.
///
/// Returns the daemon-reported exit status for data commands, or a local
/// failure code when the command never reached the daemon.
pub fn run<I, T, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
    E: Write,
{
    ExitCode::from(run_with_code(args, stdout, stderr))
}

fn run_with_code<I, T, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage_error(&error, stdout, stderr),
    };

    match execute(&cli, stdout, stderr) {
        Ok(status) => u8::try_from(status).unwrap_or(1),
        Err(error) => {
            let _ = writeln!(stderr, "error: {error}");
            error.exit_code()
        }
    }
}

fn execute<W: Write, E: Write>(
    cli: &Cli,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<i32, AppError> {
    let config = Config::load(&cli.globals.overrides())?;

    match &cli.command {
        Command::Daemon { action } => {
            let mut output = LifecycleOutput::new(&mut *stdout, &mut *stderr);
            SystemLifecycle::new(&config).handle((*action).into(), &mut output)?;
            Ok(0)
        }
        Command::Set { addr } => {
            let payload = read_stdin_payload()?;
            let request = match addr {
                None => CommandRequest::create(payload),
                Some(addr) => CommandRequest::update(&Address::parse(addr)?, payload),
            };
            send_request(&config, &request, stdout, stderr)
        }
        Command::Get { addr, raw } => {
            let request = CommandRequest::get(&Address::parse(addr)?, *raw);
            send_request(&config, &request, stdout, stderr)
        }
        Command::Range { addr } => {
            let request = CommandRequest::range(&Address::parse(addr)?);
            send_request(&config, &request, stdout, stderr)
        }
    }
}

/// Sends one request over a fresh connection, auto-starting the daemon if
/// nothing answers on the socket.
fn send_request<W: Write, E: Write>(
    config: &Config,
    request: &CommandRequest,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<i32, AppError> {
    let mut connection = match transport::connect(config.socket()) {
        Ok(connection) => connection,
        Err(error) if error.daemon_not_running() => {
            try_auto_start_daemon(config, None).map_err(|cause| match cause {
                LifecycleError::StartupFailed { .. }
                | LifecycleError::StartupAborted { .. }
                | LifecycleError::StartupTimeout { .. } => AppError::ServiceUnavailable {
                    socket: config.socket().to_string(),
                },
                other => AppError::Lifecycle(other),
            })?;
            transport::connect(config.socket()).map_err(|retry| {
                if retry.daemon_not_running() {
                    AppError::ServiceUnavailable {
                        socket: config.socket().to_string(),
                    }
                } else {
                    retry
                }
            })?
        }
        Err(error) => return Err(error),
    };

    request.write_jsonl(&mut connection)?;
    connection
        .shutdown(Shutdown::Write)
        .map_err(AppError::SendRequest)?;
    forward_daemon_messages(connection, stdout, stderr)
}

fn read_stdin_payload() -> Result<Value, AppError> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|source| AppError::ReadInput { source })?;
    command::parse_payload(&text)
}

fn report_usage_error<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> u8 {
    let rendered = error.render();
    if error.use_stderr() {
        let _ = write!(stderr, "{rendered}");
    } else {
        let _ = write!(stdout, "{rendered}");
    }
    u8::try_from(error.exit_code()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_strings(args: &[&str]) -> (u8, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = run_with_code(args.iter().copied(), &mut stdout, &mut stderr);
        (
            code,
            String::from_utf8(stdout).expect("utf8 stdout"),
            String::from_utf8(stderr).expect("utf8 stderr"),
        )
    }

    #[test]
    fn help_renders_to_stdout() {
        let (code, stdout, stderr) = run_to_strings(&["stash", "--help"]);
        assert_eq!(code, 0);
        assert!(stdout.contains("Share JSON documents"));
        assert!(stderr.is_empty());
    }

    #[test]
    fn unknown_subcommand_reports_usage_on_stderr() {
        let (code, stdout, stderr) = run_to_strings(&["stash", "frobnicate"]);
        assert_ne!(code, 0);
        assert!(stdout.is_empty());
        assert!(stderr.contains("frobnicate"));
    }

    #[test]
    fn invalid_address_fails_before_any_connection() {
        let (code, stdout, stderr) =
            run_to_strings(&["stash", "get", ".broken", "--socket", "/nonexistent/s.sock"]);
        assert_eq!(code, 1);
        assert!(stdout.is_empty());
        assert!(stderr.contains("invalid address"));
    }

    #[test]
    fn daemon_status_runs_against_empty_runtime_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let socket = dir.path().join("stashd.sock");
        let socket = socket.to_str().expect("utf8 path");
        let (code, stdout, _) =
            run_to_strings(&["stash", "daemon", "status", "--socket", socket]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "stashd is not running\n");
    }
}
