//! JSONL request dispatch for the daemon.
//!
//! The dispatch layer parses request lines into typed commands, routes them
//! to the document store, and streams JSONL responses back to the client.

mod errors;
mod handler;
mod request;
mod response;
mod router;

pub(crate) use self::handler::DispatchConnectionHandler;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
