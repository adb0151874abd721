//! Command-line front end for the Conveyor dispatcher.
//!
//! The runtime parses arguments, bootstraps configuration and telemetry,
//! submits one script to the execution backend through a background
//! dispatcher, and renders the outcome. IO streams and the configuration
//! loader are injectable so the whole flow can run under test.

use std::ffi::OsString;
use std::fmt::Display;
use std::io::{Read, Write};
use std::num::NonZeroU64;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use conveyor::CommandKind;

mod cli;
mod config;
mod errors;
mod output;
mod session;

pub use cli::OutputFormat;
use cli::{Cli, CliCommand, RunArgs};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;
use session::JobRequest;

/// Script argument that reads the script body from stdin.
const STDIN_SCRIPT: &str = "-";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, R: Read, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    let mut io = IoStreams {
        stdin,
        stdout,
        stderr,
    };
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, R, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, R, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);

    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            report(&mut *io.stdout, &error.render());
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            report(&mut *io.stderr, &AppError::CliUsage(error));
            return ExitCode::FAILURE;
        }
    };

    match execute(cli, &split.config_arguments, io, loader) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            report(&mut *io.stderr, &error);
            ExitCode::FAILURE
        }
    }
}

fn execute<R, W, E, L>(
    cli: Cli,
    config_arguments: &[OsString],
    io: &mut IoStreams<'_, R, W, E>,
    loader: &L,
) -> Result<ExitCode, AppError>
where
    R: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let config = loader.load(config_arguments)?;
    let _telemetry = conveyor::telemetry::initialise(&config)?;

    match cli.command {
        CliCommand::Run(args) => {
            let format = args.output;
            let request = job_request(args, &mut *io.stdin)?;
            let result = session::execute(&config, &request)?;
            output::render(&result, format, &mut *io.stdout, &mut *io.stderr)
        }
    }
}

fn job_request<R: Read>(args: RunArgs, stdin: &mut R) -> Result<JobRequest, AppError> {
    let script = if args.script == STDIN_SCRIPT {
        let mut body = String::new();
        stdin
            .read_to_string(&mut body)
            .map_err(AppError::ReadScript)?;
        body
    } else {
        args.script
    };
    let params = args
        .params_file
        .as_deref()
        .map(read_params)
        .transpose()?
        .unwrap_or_default();
    let kind = if args.analysis {
        CommandKind::BackgroundAnalysis
    } else {
        CommandKind::Standard
    };

    Ok(JobRequest {
        script,
        extern_object: args.extern_object,
        params,
        kind,
        job_id: args.job_id.and_then(NonZeroU64::new),
        follow: args.follow,
        poll_interval: Duration::from_millis(args.poll_interval_ms),
    })
}

fn read_params(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|source| AppError::ReadParams {
        path: path.to_path_buf(),
        source,
    })
}

fn report<T: Write>(stream: &mut T, message: &dyn Display) {
    let _ = writeln!(stream, "{message}");
}

#[cfg(test)]
mod tests;
