//! The dispatch worker and its handles.
//!
//! A [`Dispatcher`] owns the consuming side of a [`WorkQueue`]. It can be
//! driven one cycle at a time with [`Dispatcher::run_cycle`], or moved onto a
//! dedicated thread with [`Dispatcher::start`], which returns a
//! [`DispatcherHandle`] for submitting work and shutting the worker down.

mod capture;
mod cycle;
mod errors;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;

use conveyor_config::{Config, ConnectionSettings, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_WAKEUP};

use self::capture::ResponseCapture;
use crate::envelope::CommandEnvelope;
use crate::queue::WorkQueue;
use crate::reporter::{DispatchReporter, StructuredDispatchReporter};
use crate::settings::SettingsStore;

pub use self::cycle::{CycleOutcome, DispatchState};
pub use self::errors::{DispatcherError, ExchangeError, ExchangeStage};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
const WORKER_THREAD_NAME: &str = "conveyor-dispatch";

/// Tunables for the dispatch worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Upper bound on each idle wait.
    pub idle_wakeup: Duration,
    /// Upper bound on establishing a backend connection.
    pub connect_timeout: Duration,
    /// File that undecodable responses are appended to.
    pub response_dump_path: Option<Utf8PathBuf>,
}

impl DispatcherOptions {
    /// Derives options from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            idle_wakeup: config.idle_wakeup(),
            connect_timeout: config.connect_timeout(),
            response_dump_path: config.response_dump_path().map(ToOwned::to_owned),
        }
    }
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            idle_wakeup: DEFAULT_IDLE_WAKEUP,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_dump_path: None,
        }
    }
}

/// Single consumer that exchanges queued envelopes with the backend one at a
/// time.
pub struct Dispatcher {
    queue: Arc<WorkQueue>,
    settings: Arc<SettingsStore>,
    reporter: Arc<dyn DispatchReporter>,
    options: DispatcherOptions,
    capture: Option<ResponseCapture>,
    state: DispatchState,
}

impl Dispatcher {
    /// Creates a dispatcher for the backend at `settings`.
    #[must_use]
    pub fn new(settings: ConnectionSettings, options: DispatcherOptions) -> Self {
        let capture = options.response_dump_path.clone().map(ResponseCapture::new);
        Self {
            queue: Arc::new(WorkQueue::new()),
            settings: Arc::new(SettingsStore::new(settings)),
            reporter: Arc::new(StructuredDispatchReporter),
            options,
            capture,
            state: DispatchState::Idle,
        }
    }

    /// Replaces the diagnostics reporter.
    #[must_use]
    pub fn with_reporter<R>(mut self, reporter: R) -> Self
    where
        R: DispatchReporter + 'static,
    {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Returns a handle producers use to enqueue envelopes.
    #[must_use]
    pub fn submitter(&self) -> Submitter {
        Submitter {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Shared connection settings, read once per exchange attempt.
    #[must_use]
    pub const fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// Number of envelopes waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Where the worker currently is in its cycle.
    #[must_use]
    pub const fn state(&self) -> DispatchState {
        self.state
    }

    /// Requests shutdown; the next cycle returns [`CycleOutcome::Stopped`].
    pub fn request_shutdown(&self) {
        self.queue.request_shutdown();
    }

    /// Runs cycles until shutdown is requested and returns the envelopes that
    /// were still queued.
    #[must_use = "envelopes still queued at shutdown are returned for inspection"]
    pub fn run(mut self) -> Vec<CommandEnvelope> {
        self.reporter.worker_started();
        while self.run_cycle() != CycleOutcome::Stopped {}
        let pending = self.queue.drain();
        self.reporter.worker_stopped(pending.len());
        pending
    }

    /// Moves the dispatcher onto a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError::Spawn`] when the thread cannot be created.
    pub fn start(self) -> Result<DispatcherHandle, DispatcherError> {
        let queue = Arc::clone(&self.queue);
        let settings = Arc::clone(&self.settings);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || self.run())
            .map_err(DispatcherError::Spawn)?;
        Ok(DispatcherHandle {
            queue,
            settings,
            handle: Some(handle),
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("queue", &self.queue)
            .field("settings", &self.settings)
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Cloneable producer side of a dispatcher's queue.
#[derive(Debug, Clone)]
pub struct Submitter {
    queue: Arc<WorkQueue>,
}

impl Submitter {
    /// Enqueues `envelope` and wakes the worker. Never blocks on the network.
    pub fn submit(&self, envelope: CommandEnvelope) {
        self.queue.push(envelope);
    }

    /// Asks the worker to evaluate readiness predicates again.
    pub fn reevaluate(&self) {
        self.queue.reevaluate();
    }
}

/// Owner's handle to a running dispatch worker.
///
/// Dropping the handle requests shutdown without waiting for the worker.
#[derive(Debug)]
pub struct DispatcherHandle {
    queue: Arc<WorkQueue>,
    settings: Arc<SettingsStore>,
    handle: Option<thread::JoinHandle<Vec<CommandEnvelope>>>,
}

impl DispatcherHandle {
    /// Enqueues `envelope` and wakes the worker.
    pub fn submit(&self, envelope: CommandEnvelope) {
        self.queue.push(envelope);
    }

    /// Returns a cloneable submitter for other producers.
    #[must_use]
    pub fn submitter(&self) -> Submitter {
        Submitter {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Asks the worker to evaluate readiness predicates again.
    pub fn reevaluate(&self) {
        self.queue.reevaluate();
    }

    /// Replaces the backend address used from the next exchange onwards.
    pub fn update_settings(&self, settings: ConnectionSettings) {
        self.settings.update(settings);
    }

    /// Requests shutdown. An exchange in progress completes first.
    pub fn shutdown(&self) {
        self.queue.request_shutdown();
    }

    /// Waits for the worker to exit and returns the envelopes it left queued.
    ///
    /// Joining does not request shutdown; call [`DispatcherHandle::shutdown`]
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError::ThreadPanic`] if the worker panicked.
    pub fn join(mut self) -> Result<Vec<CommandEnvelope>, DispatcherError> {
        self.handle.take().map_or_else(
            || Ok(Vec::new()),
            |handle| handle.join().map_err(|_| DispatcherError::ThreadPanic),
        )
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.queue.request_shutdown();
    }
}
