//! Forwarding of daemon response streams to the client's own streams.

use std::io::{BufRead, BufReader, Read, Write};

use serde::Deserialize;

use crate::errors::AppError;

const EMPTY_LINE_LIMIT: usize = 10;

/// Response messages received from the daemon.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum DaemonMessage {
    Stream { stream: StreamTarget, data: String },
    Exit { status: i32 },
}

/// Target stream for a forwarded message.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum StreamTarget {
    Stdout,
    Stderr,
}

/// Reads daemon messages until the exit message arrives, forwarding stream
/// data verbatim to the matching local stream.
///
/// # Errors
///
/// Returns [`AppError::MissingExit`] when the connection closes without an
/// exit message, and IO or parse variants for transport failures.
pub(crate) fn forward_daemon_messages<R, W, E>(
    connection: R,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<i32, AppError>
where
    R: Read,
    W: Write,
    E: Write,
{
    let mut reader = BufReader::new(connection);
    let mut line = String::new();
    let mut exit_status: Option<i32> = None;
    let mut consecutive_empty_lines = 0;

    while reader.read_line(&mut line).map_err(AppError::ReadResponse)? != 0 {
        if line.trim().is_empty() {
            consecutive_empty_lines += 1;
            if consecutive_empty_lines >= EMPTY_LINE_LIMIT {
                break;
            }
            line.clear();
            continue;
        }
        consecutive_empty_lines = 0;
        let message: DaemonMessage =
            serde_json::from_str(&line).map_err(AppError::ParseMessage)?;
        match message {
            DaemonMessage::Stream { stream, data } => match stream {
                StreamTarget::Stdout => stdout.write_all(data.as_bytes()),
                StreamTarget::Stderr => stderr.write_all(data.as_bytes()),
            }
            .map_err(AppError::ForwardResponse)?,
            DaemonMessage::Exit { status } => exit_status = Some(status),
        }
        line.clear();
    }

    stdout.flush().map_err(AppError::ForwardResponse)?;
    stderr.flush().map_err(AppError::ForwardResponse)?;

    exit_status.ok_or(AppError::MissingExit)
}
