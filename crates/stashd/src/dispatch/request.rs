//! Request deserialisation for the dispatch loop.
//!
//! Parses JSONL request lines into typed [`CommandRequest`] objects. The
//! request schema mirrors the format produced by the `stash` client.

use serde::Deserialize;
use serde_json::Value;

use stash_store::Path;

use super::errors::DispatchError;

/// Parsed command request from a client.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Command identification.
    pub command: CommandDescriptor,
    /// Store key the operation targets; absent for `create`.
    #[serde(default)]
    pub key: Option<String>,
    /// Path expression within the document; absent means the root.
    #[serde(default)]
    pub path: Option<String>,
    /// Document payload for `create` and `update`.
    #[serde(default)]
    pub payload: Option<Value>,
    /// Whether `get` should render scalars as raw text.
    #[serde(default)]
    pub raw: bool,
}

/// Command identification within a request.
#[derive(Debug, Deserialize)]
pub struct CommandDescriptor {
    /// The operation to perform.
    pub operation: String,
}

/// Operations the daemon understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Get,
    Range,
}

impl CommandRequest {
    /// Parses a JSONL line into a command request.
    ///
    /// Trailing whitespace, including the newline delimiter, is trimmed
    /// before parsing.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedJsonl`] if the line is empty or
    /// does not match the request schema.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }
        serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)
    }

    /// Resolves the operation field.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownOperation`] for unrecognised values
    /// and [`DispatchError::InvalidStructure`] when the field is empty.
    pub fn operation(&self) -> Result<Operation, DispatchError> {
        let operation = self.command.operation.trim();
        if operation.is_empty() {
            return Err(DispatchError::invalid_structure("operation field is empty"));
        }
        match operation {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "get" => Ok(Operation::Get),
            "range" => Ok(Operation::Range),
            other => Err(DispatchError::unknown_operation(other)),
        }
    }

    /// The target key, which most operations require.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidStructure`] when the key is absent
    /// or blank.
    pub fn require_key(&self) -> Result<&str, DispatchError> {
        self.key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| DispatchError::invalid_structure("key field is required"))
    }

    /// The payload document, required by `create` and `update`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedPayload`] when absent.
    pub fn require_payload(&self) -> Result<&Value, DispatchError> {
        self.payload
            .as_ref()
            .ok_or_else(|| DispatchError::malformed_payload("payload field is required"))
    }

    /// Parses the path expression; an absent or empty path means the root.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] wrapping the path syntax error.
    pub fn parse_path(&self) -> Result<Path, DispatchError> {
        match self.path.as_deref().map(str::trim) {
            None | Some("") => Ok(Path::root()),
            Some(text) => Ok(Path::parse(text)?),
        }
    }
}

fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}
