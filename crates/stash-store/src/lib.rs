//! In-memory JSON document store shared across client invocations.
//!
//! The crate is pure logic with no IO: the daemon wires it to a socket, the
//! tests exercise it directly. Documents are `serde_json::Value` trees with
//! object member order preserved (the `preserve_order` feature), which the
//! `range` operation relies on. Addressing within a document uses a typed
//! [`Path`] parsed from the dotted/bracketed grammar at the protocol
//! boundary, so resolution logic never sees raw text.

mod error;
mod keys;
mod path;
mod resolve;
mod store;

pub use error::StoreError;
pub use keys::KeyGenerator;
pub use path::{Path, Segment};
pub use resolve::{resolve, resolve_parent_mut};
pub use store::DocumentStore;
