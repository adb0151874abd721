//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use conveyor::{DispatcherError, TelemetryError};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to read script from stdin: {0}")]
    ReadScript(io::Error),
    #[error("failed to read request parameters from {path}: {source}")]
    ReadParams {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start the dispatcher: {0}")]
    StartDispatcher(#[source] DispatcherError),
    #[error("dispatcher did not shut down cleanly: {0}")]
    StopDispatcher(#[source] DispatcherError),
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}
