//! CLI entrypoint for the `stash` document store client.
//!
//! The binary delegates to [`stash_cli::run`], which parses arguments,
//! resolves configuration, and streams a JSONL request to the daemon,
//! starting it first when necessary.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    stash_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
