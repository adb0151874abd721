//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Rendering of the backend outcome.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Script output on stdout and stderr, diagnostics on stderr.
    #[default]
    Human,
    /// A single JSON summary on stdout.
    Json,
}

/// Submits scripts to a remote execution backend.
#[derive(Parser, Debug)]
#[command(name = "conveyor", disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Structured subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Runs one script on the backend and prints its result.
    Run(RunArgs),
}

/// Arguments of `conveyor run`.
#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// External object the script runs against.
    #[arg(long = "extern-obj", value_name = "NAME")]
    pub(crate) extern_object: Option<String>,
    /// File holding serialised request parameters.
    #[arg(long, value_name = "PATH")]
    pub(crate) params_file: Option<PathBuf>,
    /// Submits the script as a background analysis.
    #[arg(long)]
    pub(crate) analysis: bool,
    /// Resumes an existing background job.
    #[arg(long, value_name = "N")]
    pub(crate) job_id: Option<u64>,
    /// Keeps polling while the backend reports the job as pending.
    #[arg(long)]
    pub(crate) follow: bool,
    /// Delay between polls of a pending job.
    #[arg(long, value_name = "N", default_value_t = 500)]
    pub(crate) poll_interval_ms: u64,
    /// Controls how the outcome is rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub(crate) output: OutputFormat,
    /// Script body, or `-` to read it from stdin.
    #[arg(value_name = "SCRIPT", allow_hyphen_values = true)]
    pub(crate) script: String,
}
