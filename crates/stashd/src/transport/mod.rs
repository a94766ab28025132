//! Unix socket listener for the daemon.
//!
//! The transport module binds the daemon socket, accepts connections in a
//! background thread, and hands each accepted stream to a
//! [`ConnectionHandler`] on its own thread. One JSONL request is served per
//! connection.

mod errors;
mod handler;
mod listener;

pub(crate) use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, MAX_REQUEST_BYTES, read_request_line};
pub(crate) use self::listener::SocketListener;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
