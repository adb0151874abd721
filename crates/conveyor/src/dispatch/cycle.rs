//! One pass of the dispatch loop, from idle back to idle.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::trace;

use super::{DISPATCH_TARGET, Dispatcher, ExchangeError, ExchangeStage};
use crate::codec;
use crate::envelope::CommandEnvelope;
use crate::outcome::{notify_failed, notify_received};
use crate::queue::{Selected, WaitStatus};
use crate::transport::{self, Connection};

/// Position of the worker within a dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// Waiting for work or shutdown.
    Idle,
    /// Scanning the queue for a ready envelope.
    Selecting,
    /// Opening the backend connection.
    Connecting,
    /// Writing the request frame.
    Sending,
    /// Reading the response.
    Receiving,
    /// Parsing the response.
    Decoding,
    /// Notifying the caller.
    Resolving,
    /// Shutdown observed; the loop has ended.
    Stopped,
}

impl DispatchState {
    /// Lowercase name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selecting => "selecting",
            Self::Connecting => "connecting",
            Self::Sending => "sending",
            Self::Receiving => "receiving",
            Self::Decoding => "decoding",
            Self::Resolving => "resolving",
            Self::Stopped => "stopped",
        }
    }
}

/// Result of a single [`Dispatcher::run_cycle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Shutdown was observed; no exchange was started.
    Stopped,
    /// No queued envelope was ready.
    NothingReady,
    /// The backend was unreachable and the caller was notified of the failure.
    ConnectFailed,
    /// The exchange failed after connecting; the envelope was dropped without
    /// notification.
    Dropped {
        /// Step at which the exchange was abandoned.
        stage: ExchangeStage,
    },
    /// The caller was notified that the backend replied.
    Delivered {
        /// Whether a decoded response was attached.
        decoded: bool,
    },
}

impl Dispatcher {
    /// Runs one cycle: waits for work, selects a ready envelope, and performs
    /// its exchange.
    ///
    /// Shutdown is only observed here, between exchanges, so an exchange that
    /// has started always runs to completion.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.enter(DispatchState::Idle);
        if self.queue.wait_for_work_or_shutdown(self.options.idle_wakeup) == WaitStatus::Shutdown {
            self.enter(DispatchState::Stopped);
            return CycleOutcome::Stopped;
        }
        self.enter(DispatchState::Selecting);
        let Some(Selected {
            envelope,
            remaining,
        }) = self.queue.pop_ready()
        else {
            if self.queue.is_shutdown() {
                self.enter(DispatchState::Stopped);
                return CycleOutcome::Stopped;
            }
            return CycleOutcome::NothingReady;
        };
        let outcome = self.dispatch(envelope, remaining);
        self.enter(DispatchState::Idle);
        outcome
    }

    fn dispatch(&mut self, envelope: CommandEnvelope, remaining: usize) -> CycleOutcome {
        let settings = self.settings.current();
        self.reporter.exchange_started(&settings, remaining);

        self.enter(DispatchState::Connecting);
        let mut connection = match transport::connect(&settings, self.options.connect_timeout) {
            Ok(connection) => connection,
            Err(error) => {
                self.reporter.connect_failed(&error);
                self.enter(DispatchState::Resolving);
                notify_failed(envelope, error.to_string(), &*self.reporter);
                return CycleOutcome::ConnectFailed;
            }
        };

        let exchanged =
            panic::catch_unwind(AssertUnwindSafe(|| self.exchange(&mut connection, &envelope)));
        drop(connection);
        let bytes = match exchanged {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(error)) => return self.abandon(envelope, &error),
            Err(payload) => {
                let error = ExchangeError::Panicked {
                    message: panic_message(&*payload),
                };
                return self.abandon(envelope, &error);
            }
        };

        self.enter(DispatchState::Decoding);
        let response = match codec::decode_response(&bytes) {
            Ok(response) => Some(response),
            Err(error) => {
                self.reporter.decode_failed(&error);
                if let Some(capture) = &self.capture {
                    capture.record(&bytes);
                }
                None
            }
        };
        let decoded = response.is_some();

        self.enter(DispatchState::Resolving);
        notify_received(envelope, response, &*self.reporter);
        if decoded {
            self.reporter.delivered(remaining);
        }
        CycleOutcome::Delivered { decoded }
    }

    fn exchange(
        &mut self,
        connection: &mut Connection,
        envelope: &CommandEnvelope,
    ) -> Result<Vec<u8>, ExchangeError> {
        self.enter(DispatchState::Sending);
        let payload = codec::encode_request(&codec::build_request(envelope));
        trace!(
            target: DISPATCH_TARGET,
            peer = %connection.peer(),
            bytes = payload.len(),
            "sending request"
        );
        connection.send_frame(&payload).map_err(ExchangeError::Send)?;

        self.enter(DispatchState::Receiving);
        let response = connection.receive_all().map_err(ExchangeError::Receive)?;
        trace!(
            target: DISPATCH_TARGET,
            bytes = response.len(),
            "response received"
        );
        Ok(response)
    }

    fn abandon(&self, envelope: CommandEnvelope, error: &ExchangeError) -> CycleOutcome {
        self.reporter.exchange_dropped(error);
        drop(envelope);
        CycleOutcome::Dropped {
            stage: error.stage(),
        }
    }

    fn enter(&mut self, state: DispatchState) {
        if self.state != state {
            trace!(
                target: DISPATCH_TARGET,
                from = self.state.as_str(),
                to = state.as_str(),
                "dispatch state changed"
            );
            self.state = state;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
