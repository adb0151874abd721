//! Diagnostics for dispatch loop events.

use std::sync::Arc;

use conveyor_config::ConnectionSettings;

use crate::codec::CodecError;
use crate::dispatch::ExchangeError;
use crate::transport::TransportError;

const REPORTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Observer notified of every dispatch loop transition.
///
/// Calls are made synchronously on the worker thread and must not block.
pub trait DispatchReporter: Send + Sync {
    /// Invoked when the worker enters its loop.
    fn worker_started(&self);

    /// Invoked when the worker leaves its loop with `pending` envelopes still
    /// queued.
    fn worker_stopped(&self, pending: usize);

    /// Invoked after an envelope was selected, before connecting.
    fn exchange_started(&self, settings: &ConnectionSettings, remaining: usize);

    /// Invoked when the backend could not be reached.
    fn connect_failed(&self, error: &TransportError);

    /// Invoked when an exchange is abandoned without notifying the caller.
    fn exchange_dropped(&self, error: &ExchangeError);

    /// Invoked when a response could not be decoded.
    fn decode_failed(&self, error: &CodecError);

    /// Invoked after the received notification fired for a decoded response.
    fn delivered(&self, remaining: usize);

    /// Invoked when an outcome handler panicked.
    fn handler_panicked(&self);
}

impl<T> DispatchReporter for Arc<T>
where
    T: DispatchReporter + ?Sized,
{
    fn worker_started(&self) {
        (**self).worker_started();
    }

    fn worker_stopped(&self, pending: usize) {
        (**self).worker_stopped(pending);
    }

    fn exchange_started(&self, settings: &ConnectionSettings, remaining: usize) {
        (**self).exchange_started(settings, remaining);
    }

    fn connect_failed(&self, error: &TransportError) {
        (**self).connect_failed(error);
    }

    fn exchange_dropped(&self, error: &ExchangeError) {
        (**self).exchange_dropped(error);
    }

    fn decode_failed(&self, error: &CodecError) {
        (**self).decode_failed(error);
    }

    fn delivered(&self, remaining: usize) {
        (**self).delivered(remaining);
    }

    fn handler_panicked(&self) {
        (**self).handler_panicked();
    }
}

/// Default reporter that records dispatch events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDispatchReporter;

impl DispatchReporter for StructuredDispatchReporter {
    fn worker_started(&self) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "worker_started",
            "dispatch worker started"
        );
    }

    fn worker_stopped(&self, pending: usize) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "worker_stopped",
            pending,
            "dispatch worker stopped"
        );
    }

    fn exchange_started(&self, settings: &ConnectionSettings, remaining: usize) {
        tracing::debug!(
            target: REPORTER_TARGET,
            event = "exchange_started",
            backend = %settings,
            remaining,
            "dispatching envelope"
        );
    }

    fn connect_failed(&self, error: &TransportError) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "connect_failed",
            error = %error,
            "backend unreachable; envelope failed"
        );
    }

    fn exchange_dropped(&self, error: &ExchangeError) {
        tracing::error!(
            target: REPORTER_TARGET,
            event = "exchange_dropped",
            stage = %error.stage(),
            error = %error,
            "exchange aborted; envelope dropped"
        );
    }

    fn decode_failed(&self, error: &CodecError) {
        tracing::error!(
            target: REPORTER_TARGET,
            event = "decode_failed",
            error = %error,
            "response could not be decoded"
        );
    }

    fn delivered(&self, remaining: usize) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "delivered",
            tasks_left = remaining,
            "exchange complete"
        );
    }

    fn handler_panicked(&self) {
        tracing::error!(
            target: REPORTER_TARGET,
            event = "handler_panicked",
            "outcome handler panicked"
        );
    }
}
