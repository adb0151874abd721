//! Command envelopes: the unit of work accepted by the dispatcher.

use std::fmt;
use std::num::NonZeroU64;
use std::time::Instant;

use crate::codec::Response;
use crate::outcome::OutcomeHandler;

/// Predicate deciding whether an envelope may be sent now.
///
/// The predicate runs on the dispatch worker while the queue lock is held, so
/// it must be cheap and must not submit work itself.
pub type ReadinessPredicate = Box<dyn Fn(&CommandEnvelope) -> bool + Send>;

/// Classification of the command that produced an envelope.
///
/// The tag only influences wire encoding: the first attempt of a
/// [`CommandKind::BackgroundAnalysis`] command is marked as a background
/// request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Ordinary synchronous script execution.
    #[default]
    Standard,
    /// Long-running analysis the backend may run as a background job.
    BackgroundAnalysis,
}

impl CommandKind {
    /// Returns true when the kind is eligible for background execution.
    #[must_use]
    pub const fn is_background_analysis(self) -> bool {
        matches!(self, Self::BackgroundAnalysis)
    }
}

/// A pending command together with the hooks that receive its outcome.
pub struct CommandEnvelope {
    script: String,
    extern_object: Option<String>,
    params: Vec<u8>,
    kind: CommandKind,
    job_id: Option<NonZeroU64>,
    retry_count: u32,
    readiness: Option<ReadinessPredicate>,
    pub(crate) response: Option<Response>,
    pub(crate) handler: Option<Box<dyn OutcomeHandler>>,
}

impl CommandEnvelope {
    /// Creates an envelope for `script` whose outcome is delivered to `handler`.
    #[must_use]
    pub fn new(script: impl Into<String>, handler: impl OutcomeHandler) -> Self {
        Self {
            script: script.into(),
            extern_object: None,
            params: Vec::new(),
            kind: CommandKind::Standard,
            job_id: None,
            retry_count: 0,
            readiness: None,
            response: None,
            handler: Some(Box::new(handler)),
        }
    }

    /// Names the external object the script runs against. Empty names are
    /// treated as absent.
    #[must_use]
    pub fn with_extern_object(mut self, name: impl Into<String>) -> Self {
        let owned: String = name.into();
        self.extern_object = (!owned.is_empty()).then_some(owned);
        self
    }

    /// Attaches opaque, already-serialised request parameters.
    #[must_use]
    pub fn with_params(mut self, params: impl Into<Vec<u8>>) -> Self {
        self.params = params.into();
        self
    }

    /// Sets the classification tag.
    #[must_use]
    pub fn with_kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Marks the envelope as a continuation of backend job `job_id`. Zero
    /// clears the job.
    #[must_use]
    pub fn with_job_id(mut self, job_id: u64) -> Self {
        self.job_id = NonZeroU64::new(job_id);
        self
    }

    /// Records how many times this command was attempted before.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Defers the envelope until `predicate` returns true.
    #[must_use]
    pub fn with_readiness<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Self) -> bool + Send + 'static,
    {
        self.readiness = Some(Box::new(predicate));
        self
    }

    /// Defers the envelope until `deadline` has passed.
    #[must_use]
    pub fn ready_after(self, deadline: Instant) -> Self {
        self.with_readiness(move |_| Instant::now() >= deadline)
    }

    /// Builds the follow-up envelope polling backend job `job_id`.
    ///
    /// The payload and classification are copied; the readiness predicate is
    /// not, and the retry counter is incremented.
    #[must_use]
    pub fn continuation(&self, job_id: NonZeroU64, handler: impl OutcomeHandler) -> Self {
        Self {
            script: self.script.clone(),
            extern_object: self.extern_object.clone(),
            params: self.params.clone(),
            kind: self.kind,
            job_id: Some(job_id),
            retry_count: self.retry_count.saturating_add(1),
            readiness: None,
            response: None,
            handler: Some(Box::new(handler)),
        }
    }

    /// Script body.
    #[must_use]
    pub fn script(&self) -> &str {
        self.script.as_str()
    }

    /// External object name, if any.
    #[must_use]
    pub fn extern_object(&self) -> Option<&str> {
        self.extern_object.as_deref()
    }

    /// Opaque request parameters.
    #[must_use]
    pub fn params(&self) -> &[u8] {
        self.params.as_slice()
    }

    /// Classification tag.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Backend job this envelope continues, if any.
    #[must_use]
    pub const fn job_id(&self) -> Option<NonZeroU64> {
        self.job_id
    }

    /// Number of earlier attempts of this command.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Decoded backend response, present only after a successful exchange.
    #[must_use]
    pub const fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Moves the decoded response out of the envelope.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Evaluates the readiness predicate. Envelopes without one are always
    /// ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.readiness
            .as_ref()
            .is_none_or(|predicate| predicate(self))
    }

    /// Returns true when the first attempt of a background analysis is being
    /// made, which is when the backend is asked to run it in the background.
    #[must_use]
    pub const fn requests_background(&self) -> bool {
        self.kind.is_background_analysis() && self.job_id.is_none() && self.retry_count == 0
    }
}

impl fmt::Debug for CommandEnvelope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandEnvelope")
            .field("script_len", &self.script.len())
            .field("extern_object", &self.extern_object)
            .field("params_len", &self.params.len())
            .field("kind", &self.kind)
            .field("job_id", &self.job_id)
            .field("retry_count", &self.retry_count)
            .field("has_readiness", &self.readiness.is_some())
            .field("has_response", &self.response.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::outcome::Outcome;

    fn discard(_: Outcome) {}

    #[rstest]
    #[case(CommandKind::BackgroundAnalysis, 0, 0, true)]
    #[case(CommandKind::BackgroundAnalysis, 7, 0, false)]
    #[case(CommandKind::BackgroundAnalysis, 0, 1, false)]
    #[case(CommandKind::BackgroundAnalysis, 7, 3, false)]
    #[case(CommandKind::Standard, 0, 0, false)]
    #[case(CommandKind::Standard, 7, 0, false)]
    #[case(CommandKind::Standard, 0, 2, false)]
    fn background_flag_truth_table(
        #[case] kind: CommandKind,
        #[case] job_id: u64,
        #[case] retry_count: u32,
        #[case] expected: bool,
    ) {
        let envelope = CommandEnvelope::new("print(1)", discard)
            .with_kind(kind)
            .with_job_id(job_id)
            .with_retry_count(retry_count);
        assert_eq!(envelope.requests_background(), expected);
    }

    #[test]
    fn empty_extern_object_is_absent() {
        let envelope = CommandEnvelope::new("", discard).with_extern_object("");
        assert_eq!(envelope.extern_object(), None);
    }

    #[test]
    fn envelopes_without_predicate_are_ready() {
        assert!(CommandEnvelope::new("", discard).is_ready());
    }

    #[test]
    fn predicate_sees_the_envelope() {
        let first_attempt =
            CommandEnvelope::new("x", discard).with_readiness(|candidate| candidate.retry_count() > 0);
        assert!(!first_attempt.is_ready());
        let retried = first_attempt.with_retry_count(1);
        assert!(retried.is_ready());
    }

    #[test]
    fn ready_after_waits_for_deadline() {
        let future = CommandEnvelope::new("", discard)
            .ready_after(Instant::now() + Duration::from_secs(3600));
        assert!(!future.is_ready());
        let past = CommandEnvelope::new("", discard).ready_after(Instant::now());
        assert!(past.is_ready());
    }

    #[test]
    fn continuation_copies_payload_and_bumps_retry() {
        let original = CommandEnvelope::new("analyse()", discard)
            .with_extern_object("module")
            .with_params(vec![1, 2, 3])
            .with_kind(CommandKind::BackgroundAnalysis)
            .with_readiness(|_| false);
        let job = NonZeroU64::new(42).expect("non-zero job id");

        let next = original.continuation(job, discard);

        assert_eq!(next.script(), "analyse()");
        assert_eq!(next.extern_object(), Some("module"));
        assert_eq!(next.params(), &[1, 2, 3]);
        assert_eq!(next.kind(), CommandKind::BackgroundAnalysis);
        assert_eq!(next.job_id(), Some(job));
        assert_eq!(next.retry_count(), 1);
        assert!(next.is_ready(), "readiness is not inherited");
        assert!(!next.requests_background());
    }
}
