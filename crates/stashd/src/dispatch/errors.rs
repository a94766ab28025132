//! Error types for request dispatch failures.

use std::io;

use thiserror::Error;

use stash_store::StoreError;

/// Errors surfaced during request parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line could not be parsed as valid JSON.
    #[error("malformed JSONL: {message}")]
    MalformedJsonl {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Request JSON does not match the command schema.
    #[error("invalid request structure: {message}")]
    InvalidStructure { message: String },

    /// Operation field contains an unrecognised value.
    #[error("unknown operation: {operation}")]
    UnknownOperation { operation: String },

    /// Request exceeds the maximum allowed size.
    #[error("request too large: exceeds {max_size} byte limit")]
    RequestTooLarge { max_size: usize },

    /// Payload field is missing or not usable for the operation.
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// Store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialisation failed.
    #[error("failed to serialise response: {0}")]
    SerialiseResponse(serde_json::Error),
}

impl DispatchError {
    /// Exit status reported to the client for this error.
    ///
    /// Protocol and store errors return status 1; infrastructure failures
    /// (IO, serialisation) return status 2.
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::MalformedJsonl { .. }
            | Self::InvalidStructure { .. }
            | Self::UnknownOperation { .. }
            | Self::RequestTooLarge { .. }
            | Self::MalformedPayload { .. }
            | Self::Store(_) => 1,
            Self::Io(_) | Self::SerialiseResponse(_) => 2,
        }
    }

    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedJsonl {
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedJsonl {
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    pub fn unknown_operation(operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            operation: operation.into(),
        }
    }

    pub fn request_too_large(max_size: usize) -> Self {
        Self::RequestTooLarge { max_size }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }
}
