//! CLI entrypoint for Conveyor.
//!
//! The binary delegates to [`conveyor_cli::run`], which loads configuration,
//! submits one script to the execution backend through a dispatcher, and
//! renders the outcome.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    conveyor_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
