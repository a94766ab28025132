//! Routing of parsed commands onto the document store.

use std::io::Write;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use stash_store::{DocumentStore, Path};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::request::{CommandRequest, Operation};
use super::response::ResponseWriter;

/// Routes validated requests to store operations and renders their output.
#[derive(Debug)]
pub(crate) struct OperationRouter {
    store: Arc<DocumentStore>,
}

impl OperationRouter {
    pub(crate) fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Executes the request, writing command output as stdout stream
    /// messages. The caller writes the terminal exit message.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] for schema violations, store failures, and
    /// write failures.
    pub(crate) fn route<W: Write>(
        &self,
        request: &CommandRequest,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), DispatchError> {
        let operation = request.operation()?;
        debug!(
            target: DISPATCH_TARGET,
            operation = ?operation,
            "dispatching request"
        );
        match operation {
            Operation::Create => self.create(request, writer),
            Operation::Update => self.update(request, writer),
            Operation::Get => self.get(request, writer),
            Operation::Range => self.range(request, writer),
        }
    }

    fn create<W: Write>(
        &self,
        request: &CommandRequest,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), DispatchError> {
        let payload = request.require_payload()?;
        let key = self.store.create(payload.clone());
        writer.write_stdout(format!("{key}\n"))
    }

    fn update<W: Write>(
        &self,
        request: &CommandRequest,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), DispatchError> {
        let key = request.require_key()?;
        let path = request.parse_path()?;
        let payload = request.require_payload()?.clone();
        if path.is_root() {
            self.store.set_root(key, payload)?;
        } else {
            self.store.set_path(key, &path, payload)?;
        }
        writer.write_stdout(format!("{}\n", address(key, &path)))
    }

    fn get<W: Write>(
        &self,
        request: &CommandRequest,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), DispatchError> {
        let key = request.require_key()?;
        let path = request.parse_path()?;
        let value = self.store.get(key, &path)?;
        writer.write_stdout(format!("{}\n", render_value(&value, request.raw)))
    }

    fn range<W: Write>(
        &self,
        request: &CommandRequest,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), DispatchError> {
        let key = request.require_key()?;
        let path = request.parse_path()?;
        for label in self.store.range(key, &path)? {
            writer.write_stdout(format!("{label}\n"))?;
        }
        Ok(())
    }
}

/// Normalised textual address of a location within a document.
///
/// The root path renders as the bare key; a path starting with an index
/// segment attaches its bracket directly to the key.
fn address(key: &str, path: &Path) -> String {
    if path.is_root() {
        return key.to_owned();
    }
    let rendered = path.to_string();
    if rendered.starts_with('[') {
        format!("{key}{rendered}")
    } else {
        format!("{key}.{rendered}")
    }
}

/// Renders a value for the client.
///
/// Raw mode strips quoting from scalars: strings print their contents,
/// numbers and booleans their literal text, and null the empty string.
/// Composite values ignore the raw flag and render as compact JSON.
fn render_value(value: &Value, raw: bool) -> String {
    if raw {
        match value {
            Value::String(text) => return text.clone(),
            Value::Null => return String::new(),
            Value::Bool(_) | Value::Number(_) => return value.to_string(),
            Value::Array(_) | Value::Object(_) => {}
        }
    }
    value.to_string()
}
