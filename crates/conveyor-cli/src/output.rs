//! Rendering of submission results.

use std::io::Write;
use std::process::ExitCode;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::errors::AppError;
use crate::session::JobResult;

/// Exit status for a request the dispatcher discarded after connecting.
const EXIT_DROPPED: u8 = 2;

const UNTRACKED_JOB: &str = "backend reported a pending job without a job id";

#[derive(Debug, Serialize)]
struct Summary<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<u64>,
    std_out: &'a str,
    std_err: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> Summary<'a> {
    fn from_result(result: &'a JobResult) -> Self {
        match result {
            JobResult::Finished(response) | JobResult::Pending(response) => Self {
                status: if response.is_pending() {
                    "pending"
                } else {
                    "finished"
                },
                job_id: (response.job_id != 0).then_some(response.job_id),
                std_out: response.std_out.as_str(),
                std_err: response.std_err.as_str(),
                error: response.error_message(),
            },
            JobResult::UntrackedJob(response) => Self {
                status: "pending",
                job_id: None,
                std_out: response.std_out.as_str(),
                std_err: response.std_err.as_str(),
                error: Some(response.error_message().unwrap_or(UNTRACKED_JOB)),
            },
            JobResult::Failed(message) => Self::without_output("failed", Some(message.as_str())),
            JobResult::Undecodable => Self::without_output("undecodable", None),
            JobResult::Dropped => Self::without_output("dropped", None),
        }
    }

    const fn without_output(status: &'static str, error: Option<&'a str>) -> Self {
        Self {
            status,
            job_id: None,
            std_out: "",
            std_err: "",
            error,
        }
    }
}

/// Exit status for `result`.
pub(crate) fn exit_code(result: &JobResult) -> ExitCode {
    match result {
        JobResult::Finished(response) if response.error_message().is_some() => ExitCode::FAILURE,
        JobResult::Finished(_) | JobResult::Pending(_) => ExitCode::SUCCESS,
        JobResult::UntrackedJob(_) | JobResult::Failed(_) | JobResult::Undecodable => {
            ExitCode::FAILURE
        }
        JobResult::Dropped => ExitCode::from(EXIT_DROPPED),
    }
}

/// Writes `result` in `format` and returns the matching exit status.
pub(crate) fn render<W, E>(
    result: &JobResult,
    format: OutputFormat,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
{
    match format {
        OutputFormat::Human => render_human(result, stdout, stderr),
        OutputFormat::Json => render_json(result, stdout),
    }
    .map_err(AppError::WriteOutput)?;
    Ok(exit_code(result))
}

fn render_human<W, E>(result: &JobResult, stdout: &mut W, stderr: &mut E) -> std::io::Result<()>
where
    W: Write,
    E: Write,
{
    match result {
        JobResult::Finished(response) | JobResult::Pending(response) => {
            stdout.write_all(response.std_out.as_bytes())?;
            stderr.write_all(response.std_err.as_bytes())?;
            if let Some(error) = response.error_message() {
                writeln!(stderr, "backend error: {error}")?;
            }
            if let Some(job_id) = response.pending_job() {
                writeln!(
                    stderr,
                    "job {job_id} is still running; resume it with --job-id {job_id}"
                )?;
            }
        }
        JobResult::UntrackedJob(response) => {
            stdout.write_all(response.std_out.as_bytes())?;
            stderr.write_all(response.std_err.as_bytes())?;
            if let Some(error) = response.error_message() {
                writeln!(stderr, "backend error: {error}")?;
            }
            writeln!(stderr, "{UNTRACKED_JOB}")?;
        }
        JobResult::Failed(message) => writeln!(stderr, "{message}")?,
        JobResult::Undecodable => writeln!(stderr, "backend reply could not be decoded")?,
        JobResult::Dropped => writeln!(stderr, "request was dropped before a reply arrived")?,
    }
    stdout.flush()?;
    stderr.flush()
}

fn render_json<W: Write>(result: &JobResult, stdout: &mut W) -> std::io::Result<()> {
    serde_json::to_writer(&mut *stdout, &Summary::from_result(result))?;
    writeln!(stdout)?;
    stdout.flush()
}
