//! Terminal outcomes and their delivery to the submitting caller.
//!
//! Handlers are consumed when they fire, so an envelope can be notified at
//! most once. The only path that fires nothing is the silent drop after a
//! failed send or receive; the handler is then dropped unused, which callers
//! holding an [`outcome_channel`] receiver observe as a disconnect.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

use tracing::debug;

use crate::codec::Response;
use crate::envelope::CommandEnvelope;
use crate::reporter::DispatchReporter;

const OUTCOME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::outcome");

/// Failure message used when the transport reports an empty error.
pub const DEFAULT_CONNECT_FAILURE: &str = "failed to connect to backend";

/// Terminal state of a dispatched envelope.
#[derive(Debug)]
pub enum Outcome {
    /// The backend replied. The envelope carries the decoded response unless
    /// decoding failed.
    Received(CommandEnvelope),
    /// The backend could not be reached.
    Failed {
        /// The envelope that was not delivered.
        envelope: CommandEnvelope,
        /// Human-readable reason, never empty.
        message: String,
    },
}

impl Outcome {
    /// The envelope the outcome refers to.
    #[must_use]
    pub const fn envelope(&self) -> &CommandEnvelope {
        match self {
            Self::Received(envelope) | Self::Failed { envelope, .. } => envelope,
        }
    }

    /// Returns ownership of the envelope.
    #[must_use]
    pub fn into_envelope(self) -> CommandEnvelope {
        match self {
            Self::Received(envelope) | Self::Failed { envelope, .. } => envelope,
        }
    }

    /// Decoded response, if the exchange produced one.
    #[must_use]
    pub const fn response(&self) -> Option<&Response> {
        match self {
            Self::Received(envelope) => envelope.response(),
            Self::Failed { .. } => None,
        }
    }

    /// Failure message, if the envelope failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Received(_) => None,
            Self::Failed { message, .. } => Some(message.as_str()),
        }
    }

    /// Returns true for [`Outcome::Received`].
    #[must_use]
    pub const fn is_received(&self) -> bool {
        matches!(self, Self::Received(_))
    }
}

/// Receives the terminal outcome of one envelope.
///
/// Any `FnOnce(Outcome) + Send` closure is a handler. Handlers run on the
/// dispatch worker; a panicking handler is contained and reported, but a
/// blocking handler stalls the dispatcher.
pub trait OutcomeHandler: Send + 'static {
    /// Consumes the handler with the envelope's outcome.
    fn handle(self: Box<Self>, outcome: Outcome);
}

impl<F> OutcomeHandler for F
where
    F: FnOnce(Outcome) + Send + 'static,
{
    fn handle(self: Box<Self>, outcome: Outcome) {
        (*self)(outcome);
    }
}

/// Handler forwarding outcomes into an [`mpsc`] channel.
#[derive(Debug, Clone)]
pub struct OutcomeSender {
    sender: mpsc::Sender<Outcome>,
}

impl OutcomeHandler for OutcomeSender {
    fn handle(self: Box<Self>, outcome: Outcome) {
        if self.sender.send(outcome).is_err() {
            debug!(
                target: OUTCOME_TARGET,
                "outcome receiver dropped before delivery"
            );
        }
    }
}

/// Creates a cloneable handler and the receiver its outcomes arrive on.
///
/// The receiver disconnects once every clone of the sender has either fired
/// or been dropped, which makes silently dropped envelopes observable.
#[must_use]
pub fn outcome_channel() -> (OutcomeSender, mpsc::Receiver<Outcome>) {
    let (sender, receiver) = mpsc::channel();
    (OutcomeSender { sender }, receiver)
}

/// Attaches `response` to the envelope and fires the received notification.
pub(crate) fn notify_received(
    mut envelope: CommandEnvelope,
    response: Option<Response>,
    reporter: &dyn DispatchReporter,
) {
    debug_assert!(envelope.response.is_none(), "result slot written twice");
    envelope.response = response;
    let Some(handler) = envelope.handler.take() else {
        return;
    };
    fire(handler, Outcome::Received(envelope), reporter);
}

/// Fires the failed notification with `message`, or a generic message when it
/// is empty.
pub(crate) fn notify_failed(
    mut envelope: CommandEnvelope,
    message: String,
    reporter: &dyn DispatchReporter,
) {
    let Some(handler) = envelope.handler.take() else {
        return;
    };
    let text = if message.trim().is_empty() {
        DEFAULT_CONNECT_FAILURE.to_owned()
    } else {
        message
    };
    fire(
        handler,
        Outcome::Failed {
            envelope,
            message: text,
        },
        reporter,
    );
}

fn fire(handler: Box<dyn OutcomeHandler>, outcome: Outcome, reporter: &dyn DispatchReporter) {
    if panic::catch_unwind(AssertUnwindSafe(move || handler.handle(outcome))).is_err() {
        reporter.handler_panicked();
    }
}
