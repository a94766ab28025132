//! Connection handler that dispatches JSONL commands.
//!
//! Implements the transport layer's [`ConnectionHandler`] trait: reads one
//! JSONL request, routes it through the [`OperationRouter`], and streams
//! the response back before closing the connection.

use std::io;
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use tracing::{debug, warn};

use stash_store::DocumentStore;

use crate::activity::ActivityMonitor;
use crate::transport::{ConnectionHandler, MAX_REQUEST_BYTES, read_request_line};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::request::CommandRequest;
use super::response::ResponseWriter;
use super::router::OperationRouter;

/// Connection handler that parses and dispatches JSONL commands.
///
/// Each connection is handled synchronously on its own thread: a single
/// request line is read, routed, and answered with stream messages and a
/// terminal exit message. The activity monitor is informed for the full
/// span of the request so the idle watcher never interrupts one.
#[derive(Debug)]
pub struct DispatchConnectionHandler {
    router: OperationRouter,
    activity: Arc<ActivityMonitor>,
}

impl DispatchConnectionHandler {
    pub fn new(store: Arc<DocumentStore>, activity: Arc<ActivityMonitor>) -> Self {
        Self {
            router: OperationRouter::new(store),
            activity,
        }
    }

    fn dispatch(&self, mut stream: UnixStream) {
        let _guard = self.activity.begin_request();

        let request_bytes = match read_request_line(&mut stream) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                let error = classify_read_error(error);
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                let mut writer = ResponseWriter::new(&mut stream);
                let _ = writer.write_error(&error);
                return;
            }
        };

        let mut writer = ResponseWriter::new(&mut stream);

        let request = match CommandRequest::parse(&request_bytes) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                let _ = writer.write_error(&error);
                return;
            }
        };

        match self.router.route(&request, &mut writer) {
            Ok(()) => {
                if let Err(error) = writer.write_exit(0) {
                    warn!(target: DISPATCH_TARGET, %error, "failed to write exit");
                }
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "dispatch failed");
                let _ = writer.write_error(&error);
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: UnixStream) {
        self.dispatch(stream);
    }
}

fn classify_read_error(error: io::Error) -> DispatchError {
    if error.kind() == io::ErrorKind::InvalidData {
        DispatchError::request_too_large(MAX_REQUEST_BYTES)
    } else {
        DispatchError::Io(error)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::thread::{self, JoinHandle};

    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    /// Server/client socket pair exercising the handler end to end.
    struct HandlerTestHarness {
        client: UnixStream,
        server_handle: JoinHandle<()>,
        store: Arc<DocumentStore>,
    }

    impl HandlerTestHarness {
        fn send_and_collect(&mut self, request: &[u8]) -> Vec<String> {
            self.client.write_all(request).expect("write request");
            self.client
                .shutdown(std::net::Shutdown::Write)
                .expect("shutdown write");

            let mut reader = BufReader::new(&mut self.client);
            let mut lines = Vec::new();
            let mut line = String::new();
            while reader.read_line(&mut line).expect("read") > 0 {
                lines.push(line.clone());
                line.clear();
            }
            lines
        }

        fn join(self) {
            self.server_handle.join().expect("server join");
        }
    }

    #[fixture]
    fn harness() -> HandlerTestHarness {
        let store = Arc::new(DocumentStore::new());
        let activity = Arc::new(ActivityMonitor::new());
        let (client, server) = UnixStream::pair().expect("socket pair");

        let handler_store = Arc::clone(&store);
        let server_handle = thread::spawn(move || {
            DispatchConnectionHandler::new(handler_store, activity).handle(server);
        });

        HandlerTestHarness {
            client,
            server_handle,
            store,
        }
    }

    #[rstest]
    fn handler_creates_and_stores_document(mut harness: HandlerTestHarness) {
        let lines = harness
            .send_and_collect(b"{\"command\":{\"operation\":\"create\"},\"payload\":{\"a\":1}}\n");

        assert!(lines.iter().any(|line| line.contains(r#""stream":"stdout""#)));
        assert!(lines.iter().any(|line| line.contains(r#""status":0"#)));
        assert_eq!(harness.store.len(), 1);

        harness.join();
    }

    #[rstest]
    fn handler_round_trips_get(mut harness: HandlerTestHarness) {
        let key = harness.store.create(json!({"a": {"b": [10, 20]}}));
        let request = format!(
            "{{\"command\":{{\"operation\":\"get\"}},\"key\":\"{key}\",\"path\":\"a.b[1]\"}}\n"
        );
        let lines = harness.send_and_collect(request.as_bytes());

        assert!(lines.iter().any(|line| line.contains("\"data\":\"20\\n\"")));
        assert!(lines.iter().any(|line| line.contains(r#""status":0"#)));

        harness.join();
    }

    #[rstest]
    fn handler_rejects_malformed_json(mut harness: HandlerTestHarness) {
        let lines = harness.send_and_collect(b"not valid json\n");

        assert!(lines.iter().any(|line| line.contains("error:")));
        assert!(lines.iter().any(|line| line.contains(r#""status":1"#)));

        harness.join();
    }

    #[rstest]
    fn handler_rejects_unknown_operation(mut harness: HandlerTestHarness) {
        let lines =
            harness.send_and_collect(b"{\"command\":{\"operation\":\"obliterate\"},\"key\":\"k\"}\n");

        assert!(lines.iter().any(|line| line.contains("unknown operation")));
        assert!(lines.iter().any(|line| line.contains(r#""status":1"#)));

        harness.join();
    }

    #[rstest]
    fn handler_reports_missing_key(mut harness: HandlerTestHarness) {
        let lines = harness.send_and_collect(b"{\"command\":{\"operation\":\"get\"}}\n");

        assert!(lines.iter().any(|line| line.contains("key field is required")));
        assert!(lines.iter().any(|line| line.contains(r#""status":1"#)));

        harness.join();
    }

    #[rstest]
    fn handler_rejects_oversized_request(mut harness: HandlerTestHarness) {
        // Slightly over the limit so the unread tail fits in the socket
        // buffer and the client's write never wedges.
        let mut request = Vec::with_capacity(MAX_REQUEST_BYTES + 1024);
        request.extend_from_slice(b"{\"command\":{\"operation\":\"create\"},\"payload\":\"");
        request.resize(MAX_REQUEST_BYTES + 256, b'x');
        request.extend_from_slice(b"\"}\n");
        let lines = harness.send_and_collect(&request);

        assert!(lines.iter().any(|line| line.contains("request too large")));
        assert!(lines.iter().any(|line| line.contains(r#""status":1"#)));

        harness.join();
    }
}
