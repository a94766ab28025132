//! The `stashd` daemon: a process-scoped JSON document store behind a Unix
//! socket.
//!
//! The daemon is started lazily by the first `stash` invocation that cannot
//! reach a running instance, serves one JSONL request per connection, and
//! shuts itself down after a configurable window of inactivity so it never
//! lingers as an orphan. Singleton startup is guarded by exclusive creation
//! of a lock file next to the socket; readiness is published through a
//! health snapshot file polled by the client.

mod activity;
mod dispatch;
mod process;
mod telemetry;
mod transport;

pub use activity::ActivityMonitor;
pub use process::{LaunchError, LaunchMode, run_daemon};
pub use telemetry::{TelemetryError, initialise_telemetry};
