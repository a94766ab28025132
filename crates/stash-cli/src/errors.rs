//! Error surface for the `stash` client.

use std::io;

use thiserror::Error;

use stash_config::ConfigError;

use crate::lifecycle::LifecycleError;

/// Errors raised while running a client command.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(#[from] ConfigError),
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("malformed input: {source}")]
    MalformedInput {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read payload from stdin: {source}")]
    ReadInput {
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to daemon at {socket}: {source}")]
    Connect {
        socket: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialise command request: {0}")]
    SerialiseRequest(serde_json::Error),
    #[error("failed to send request to daemon: {0}")]
    SendRequest(io::Error),
    #[error("failed to read response from daemon: {0}")]
    ReadResponse(io::Error),
    #[error("failed to parse daemon message: {0}")]
    ParseMessage(serde_json::Error),
    #[error("failed to forward daemon output: {0}")]
    ForwardResponse(io::Error),
    #[error("daemon closed the stream without sending an exit status")]
    MissingExit,
    #[error("daemon did not become ready at {socket}; see 'stash daemon status'")]
    ServiceUnavailable { socket: String },
    #[error("daemon lifecycle command failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl AppError {
    /// Process exit code for the error.
    ///
    /// Rejected input exits with 1; transport, configuration, and lifecycle
    /// failures exit with 2, matching the daemon's own status convention.
    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidAddress { .. } | Self::MalformedInput { .. } => 1,
            _ => 2,
        }
    }

    /// Whether the error indicates no daemon is listening, which the runner
    /// answers by starting one and retrying.
    pub(crate) fn daemon_not_running(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}
