//! CLI entrypoint for the Vigil daemon.
//!
//! The binary delegates to [`vigil_cli::run`], which validates the request
//! locally and forwards it to the configured daemon socket.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    vigil_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
