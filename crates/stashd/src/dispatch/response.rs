//! Response serialisation helpers for the dispatch loop.
//!
//! Provides the [`DaemonMessage`] type and [`ResponseWriter`] helper for
//! streaming JSONL responses back to clients.

use std::io::Write;

use serde::Serialize;

use super::errors::DispatchError;

/// Target stream for output messages.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTarget {
    /// Standard output stream.
    Stdout,
    /// Standard error stream.
    Stderr,
}

/// Response messages sent to clients.
///
/// Each message is serialised as a single JSONL line. The client reads
/// lines until it receives an `Exit` message, which ends the response
/// stream.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaemonMessage {
    /// Streamed output directed to stdout or stderr.
    Stream {
        /// Target stream on the client side.
        stream: StreamTarget,
        /// Text payload to write.
        data: String,
    },
    /// Terminal message signalling completion with an exit status.
    Exit {
        /// Exit status code, zero on success.
        status: i32,
    },
}

impl DaemonMessage {
    /// Creates a stdout stream message.
    pub fn stdout(data: impl Into<String>) -> Self {
        Self::Stream {
            stream: StreamTarget::Stdout,
            data: data.into(),
        }
    }

    /// Creates a stderr stream message.
    pub fn stderr(data: impl Into<String>) -> Self {
        Self::Stream {
            stream: StreamTarget::Stderr,
            data: data.into(),
        }
    }

    /// Creates an exit message with the given status code.
    pub fn exit(status: i32) -> Self {
        Self::Exit { status }
    }
}

/// Writer that serialises daemon messages to a stream.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a daemon message as a JSONL line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub fn write_message(&mut self, message: &DaemonMessage) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, message)
            .map_err(DispatchError::SerialiseResponse)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Writes a line of command output destined for the client's stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_stdout(&mut self, data: impl Into<String>) -> Result<(), DispatchError> {
        self.write_message(&DaemonMessage::stdout(data))
    }

    /// Writes a diagnostic line destined for the client's stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_stderr(&mut self, data: impl Into<String>) -> Result<(), DispatchError> {
        self.write_message(&DaemonMessage::stderr(data))
    }

    /// Writes an exit message and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn write_exit(&mut self, status: i32) -> Result<(), DispatchError> {
        self.write_message(&DaemonMessage::exit(status))?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes an error message to stderr followed by an exit message
    /// carrying the error's status code.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_stderr(format!("error: {error}\n"))?;
        self.write_exit(error.exit_status())
    }
}
