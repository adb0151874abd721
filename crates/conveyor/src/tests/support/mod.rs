//! Shared helpers for dispatcher tests.

mod fake_backend;
mod reporter;

use std::sync::Arc;
use std::time::Duration;

use conveyor_config::ConnectionSettings;

use crate::dispatch::{Dispatcher, DispatcherOptions};

pub use fake_backend::{BackendReply, FakeBackend, finished, pending, unreachable_backend};
pub use reporter::{DispatchEvent, RecordingReporter};

/// Idle wake-up short enough to keep deferred-work tests quick.
pub const FAST_WAKEUP: Duration = Duration::from_millis(25);

/// Upper bound on waiting for an outcome in tests.
pub const OUTCOME_TIMEOUT: Duration = Duration::from_secs(5);

/// Script larger than the socket buffers on both ends, so writing it to a
/// peer that never reads is bound to fail.
pub fn oversized_script() -> String {
    "x".repeat(64 << 20)
}

/// Options with a short idle wake-up and connect timeout.
pub fn fast_options() -> DispatcherOptions {
    DispatcherOptions {
        idle_wakeup: FAST_WAKEUP,
        connect_timeout: Duration::from_secs(2),
        response_dump_path: None,
    }
}

/// Builds a dispatcher reporting into `reporter`.
pub fn dispatcher(
    settings: ConnectionSettings,
    options: DispatcherOptions,
    reporter: &Arc<RecordingReporter>,
) -> Dispatcher {
    Dispatcher::new(settings, options).with_reporter(Arc::clone(reporter))
}
