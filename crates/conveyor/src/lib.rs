//! Background dispatcher for a remote execution backend.
//!
//! Producers on any thread submit [`CommandEnvelope`]s. A single worker takes
//! them off a shared [`WorkQueue`] one at a time, in insertion order among the
//! envelopes whose readiness predicate holds, and exchanges each with the
//! backend over a fresh TCP connection:
//!
//! 1. the request is encoded as a protobuf [`ExecuteRequest`] and written
//!    behind a `u64` little-endian length prefix;
//! 2. the response is read until the backend closes the connection and
//!    decoded as a [`Response`];
//! 3. the envelope's [`OutcomeHandler`] fires exactly once.
//!
//! Failures follow a fixed policy. An unreachable backend fails the envelope
//! with a message. A send or receive failure drops the envelope without
//! notifying anyone, leaving retries to the caller. A response that cannot be
//! decoded is still reported as received, with no response attached.
//!
//! ```no_run
//! use conveyor::{CommandEnvelope, Dispatcher, DispatcherOptions, outcome_channel};
//! use conveyor_config::ConnectionSettings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConnectionSettings::new("127.0.0.1", 3852);
//! let handle = Dispatcher::new(settings, DispatcherOptions::default()).start()?;
//! let (sender, outcomes) = outcome_channel();
//! handle.submit(CommandEnvelope::new("print('hello')", sender));
//! let outcome = outcomes.recv()?;
//! handle.shutdown();
//! let _pending = handle.join()?;
//! # drop(outcome);
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod dispatch;
mod envelope;
mod outcome;
mod queue;
mod reporter;
mod settings;
pub mod telemetry;
pub mod transport;

pub use codec::{CodecError, ExecuteRequest, JobStatus, Response};
pub use dispatch::{
    CycleOutcome, DispatchState, Dispatcher, DispatcherError, DispatcherHandle, DispatcherOptions,
    ExchangeError, ExchangeStage, Submitter,
};
pub use envelope::{CommandEnvelope, CommandKind, ReadinessPredicate};
pub use outcome::{DEFAULT_CONNECT_FAILURE, Outcome, OutcomeHandler, OutcomeSender, outcome_channel};
pub use queue::{Selected, WaitStatus, WorkQueue};
pub use reporter::{DispatchReporter, StructuredDispatchReporter};
pub use settings::SettingsStore;
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::TransportError;

#[cfg(test)]
mod tests;
