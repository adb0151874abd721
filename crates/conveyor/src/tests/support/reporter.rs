//! Test double for [`DispatchReporter`] that records events for assertions.

use std::sync::Mutex;

use conveyor_config::ConnectionSettings;

use crate::codec::CodecError;
use crate::dispatch::{ExchangeError, ExchangeStage};
use crate::reporter::DispatchReporter;
use crate::transport::TransportError;

/// Dispatch events captured during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// The worker loop began.
    WorkerStarted,
    /// The worker loop ended with envelopes still queued.
    WorkerStopped { pending: usize },
    /// An envelope was selected.
    ExchangeStarted { remaining: usize },
    /// The backend was unreachable.
    ConnectFailed,
    /// An exchange was abandoned.
    ExchangeDropped(ExchangeStage),
    /// A response failed to decode.
    DecodeFailed,
    /// A received notification fired.
    Delivered { remaining: usize },
    /// A handler panicked.
    HandlerPanicked,
}

/// Records dispatch events in arrival order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .expect("dispatch reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: DispatchEvent) {
        self.events
            .lock()
            .expect("dispatch reporter mutex poisoned")
            .push(event);
    }
}

impl DispatchReporter for RecordingReporter {
    fn worker_started(&self) {
        self.record(DispatchEvent::WorkerStarted);
    }

    fn worker_stopped(&self, pending: usize) {
        self.record(DispatchEvent::WorkerStopped { pending });
    }

    fn exchange_started(&self, _settings: &ConnectionSettings, remaining: usize) {
        self.record(DispatchEvent::ExchangeStarted { remaining });
    }

    fn connect_failed(&self, _error: &TransportError) {
        self.record(DispatchEvent::ConnectFailed);
    }

    fn exchange_dropped(&self, error: &ExchangeError) {
        self.record(DispatchEvent::ExchangeDropped(error.stage()));
    }

    fn decode_failed(&self, _error: &CodecError) {
        self.record(DispatchEvent::DecodeFailed);
    }

    fn delivered(&self, remaining: usize) {
        self.record(DispatchEvent::Delivered { remaining });
    }

    fn handler_panicked(&self) {
        self.record(DispatchEvent::HandlerPanicked);
    }
}
