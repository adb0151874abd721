//! Drives one script submission through a dispatcher.
//!
//! Every attempt gets its own outcome channel, so a disconnect on the current
//! receiver means the dispatcher dropped that attempt without notification.

use std::num::NonZeroU64;
use std::time::{Duration, Instant};

use conveyor::{
    CommandEnvelope, CommandKind, Dispatcher, DispatcherOptions, Outcome, OutcomeSender, Response,
    outcome_channel,
};
use conveyor_config::Config;

use crate::errors::AppError;

/// Script submission assembled from the command line.
#[derive(Debug, Clone)]
pub(crate) struct JobRequest {
    pub(crate) script: String,
    pub(crate) extern_object: Option<String>,
    pub(crate) params: Vec<u8>,
    pub(crate) kind: CommandKind,
    pub(crate) job_id: Option<NonZeroU64>,
    pub(crate) follow: bool,
    pub(crate) poll_interval: Duration,
}

impl JobRequest {
    fn envelope(&self, handler: OutcomeSender) -> CommandEnvelope {
        let mut envelope = CommandEnvelope::new(self.script.clone(), handler)
            .with_params(self.params.clone())
            .with_kind(self.kind);
        if let Some(name) = self.extern_object.as_deref() {
            envelope = envelope.with_extern_object(name);
        }
        if let Some(job_id) = self.job_id {
            envelope = envelope.with_job_id(job_id.get());
        }
        envelope
    }
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JobResult {
    /// The backend finished the script.
    Finished(Response),
    /// The backend is still running the job and polling was not requested.
    Pending(Response),
    /// The backend reported a pending job without an id to poll it by.
    UntrackedJob(Response),
    /// The backend could not be reached.
    Failed(String),
    /// The backend replied with bytes that did not decode.
    Undecodable,
    /// The exchange broke after connecting and the request was discarded.
    Dropped,
}

/// Submits `request` and waits for its final outcome.
pub(crate) fn execute(config: &Config, request: &JobRequest) -> Result<JobResult, AppError> {
    let handle = Dispatcher::new(
        config.connection_settings(),
        DispatcherOptions::from_config(config),
    )
    .start()
    .map_err(AppError::StartDispatcher)?;

    let (sender, first_receiver) = outcome_channel();
    handle.submit(request.envelope(sender));

    let mut receiver = first_receiver;
    let result = loop {
        let Ok(outcome) = receiver.recv() else {
            break JobResult::Dropped;
        };
        let mut envelope = match outcome {
            Outcome::Failed { message, .. } => break JobResult::Failed(message),
            Outcome::Received(envelope) => envelope,
        };
        let Some(response) = envelope.take_response() else {
            break JobResult::Undecodable;
        };
        match response.pending_job() {
            Some(job_id) if request.follow => {
                let (next_sender, next_receiver) = outcome_channel();
                let poll_at = Instant::now()
                    .checked_add(request.poll_interval)
                    .unwrap_or_else(Instant::now);
                handle.submit(envelope.continuation(job_id, next_sender).ready_after(poll_at));
                receiver = next_receiver;
            }
            Some(_) => break JobResult::Pending(response),
            None if response.is_pending() => break JobResult::UntrackedJob(response),
            None => break JobResult::Finished(response),
        }
    };

    handle.shutdown();
    let leftover = handle.join().map_err(AppError::StopDispatcher)?;
    debug_assert!(leftover.is_empty(), "submission finished with work queued");
    Ok(result)
}
