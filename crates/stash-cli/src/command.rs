//! Request serialisation for the client.
//!
//! Builds the JSONL request envelope consumed by the daemon's dispatch
//! layer and writes it to the connection.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::address::Address;
use crate::errors::AppError;

/// Operations supported by the daemon.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Operation {
    Create,
    Update,
    Get,
    Range,
}

#[derive(Debug, Serialize)]
struct CommandDescriptor {
    operation: Operation,
}

/// Request envelope serialised as a single JSON line.
#[derive(Debug, Serialize)]
pub(crate) struct CommandRequest {
    command: CommandDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    raw: bool,
}

impl CommandRequest {
    pub(crate) fn create(payload: Value) -> Self {
        Self {
            command: CommandDescriptor {
                operation: Operation::Create,
            },
            key: None,
            path: None,
            payload: Some(payload),
            raw: false,
        }
    }

    pub(crate) fn update(address: &Address, payload: Value) -> Self {
        Self {
            command: CommandDescriptor {
                operation: Operation::Update,
            },
            key: Some(address.key().to_owned()),
            path: address.path().map(str::to_owned),
            payload: Some(payload),
            raw: false,
        }
    }

    pub(crate) fn get(address: &Address, raw: bool) -> Self {
        Self {
            command: CommandDescriptor {
                operation: Operation::Get,
            },
            key: Some(address.key().to_owned()),
            path: address.path().map(str::to_owned),
            payload: None,
            raw,
        }
    }

    pub(crate) fn range(address: &Address) -> Self {
        Self {
            command: CommandDescriptor {
                operation: Operation::Range,
            },
            key: Some(address.key().to_owned()),
            path: address.path().map(str::to_owned),
            payload: None,
            raw: false,
        }
    }

    /// Serialises the request as a JSONL line onto the connection.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SerialiseRequest`] or [`AppError::SendRequest`].
    pub(crate) fn write_jsonl<W: Write>(&self, writer: &mut W) -> Result<(), AppError> {
        let mut line = serde_json::to_vec(self).map_err(AppError::SerialiseRequest)?;
        line.push(b'\n');
        writer.write_all(&line).map_err(AppError::SendRequest)?;
        writer.flush().map_err(AppError::SendRequest)
    }
}

/// Parses the stdin payload as JSON before any daemon contact.
///
/// # Errors
///
/// Returns [`AppError::MalformedInput`] for unparseable text, so a typo
/// fails fast without touching the store.
pub(crate) fn parse_payload(text: &str) -> Result<Value, AppError> {
    serde_json::from_str(text).map_err(|source| AppError::MalformedInput { source })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn address(text: &str) -> Address {
        Address::parse(text).expect("valid address")
    }

    #[test]
    fn create_request_omits_key_and_path() {
        let request = CommandRequest::create(json!({"a": 1}));
        let mut line = Vec::new();
        request.write_jsonl(&mut line).expect("serialise");
        let text = String::from_utf8(line).expect("utf8");
        assert_eq!(
            text,
            "{\"command\":{\"operation\":\"create\"},\"payload\":{\"a\":1}}\n"
        );
    }

    #[test]
    fn update_request_carries_address() {
        let request = CommandRequest::update(&address("k1.a.b"), json!([1, 2]));
        let text = serde_json::to_string(&request).expect("serialise");
        assert!(text.contains("\"operation\":\"update\""));
        assert!(text.contains("\"key\":\"k1\""));
        assert!(text.contains("\"path\":\"a.b\""));
        assert!(text.contains("\"payload\":[1,2]"));
    }

    #[test]
    fn raw_flag_serialises_only_when_set() {
        let plain = serde_json::to_string(&CommandRequest::get(&address("k1"), false))
            .expect("serialise");
        assert!(!plain.contains("raw"));
        let raw = serde_json::to_string(&CommandRequest::get(&address("k1"), true))
            .expect("serialise");
        assert!(raw.contains("\"raw\":true"));
    }

    #[test]
    fn payload_parsing_fails_fast_on_bad_json() {
        assert!(matches!(
            parse_payload("{not json"),
            Err(AppError::MalformedInput { .. })
        ));
        assert_eq!(parse_payload("[1,2]").expect("valid"), json!([1, 2]));
    }
}
