//! Shared work queue drained by the dispatch worker.
//!
//! Producers push from any thread; a single consumer selects the first ready
//! envelope in insertion order. Envelopes whose readiness predicate is false
//! stay queued and may be overtaken by later ones.
//!
//! The queue tracks whether anything changed since the last unsuccessful
//! scan. Waiting returns immediately only when a push or an explicit
//! re-evaluation happened since then, so a queue holding nothing but
//! not-ready envelopes is paced by the bounded wait instead of spinning.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::envelope::CommandEnvelope;

const QUEUE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::queue");

/// An envelope removed from the queue for dispatch.
#[derive(Debug)]
pub struct Selected {
    /// The envelope to dispatch.
    pub envelope: CommandEnvelope,
    /// Number of envelopes left in the queue after the removal.
    pub remaining: usize,
}

/// Why [`WorkQueue::wait_for_work_or_shutdown`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Shutdown was requested.
    Shutdown,
    /// Envelopes were pushed or re-evaluation was requested since the last
    /// unsuccessful scan.
    WorkAvailable,
    /// The wake-up interval elapsed without a signal.
    TimedOut,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<CommandEnvelope>,
    shutdown: bool,
    rescan: bool,
}

/// Mutex-protected queue of pending envelopes paired with a wake-up signal.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    signal: Condvar,
}

impl WorkQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `envelope` and wakes the consumer.
    pub fn push(&self, envelope: CommandEnvelope) {
        let mut state = self.lock();
        state.items.push_back(envelope);
        state.rescan = true;
        drop(state);
        self.signal.notify_one();
    }

    /// Removes the first envelope whose readiness predicate holds.
    ///
    /// Returns `None` without blocking when nothing is ready or once shutdown
    /// has been requested. A predicate that panics is treated as not ready.
    #[must_use = "a popped envelope is lost unless it is dispatched"]
    pub fn pop_ready(&self) -> Option<Selected> {
        let mut state = self.lock();
        if state.shutdown {
            return None;
        }
        let position = state.items.iter().position(evaluate_readiness);
        let Some(index) = position else {
            state.rescan = false;
            return None;
        };
        let envelope = state.items.remove(index)?;
        let remaining = state.items.len();
        state.rescan = remaining > 0;
        Some(Selected {
            envelope,
            remaining,
        })
    }

    /// Blocks until work may be available, shutdown is requested, or
    /// `timeout` elapses.
    #[must_use]
    pub fn wait_for_work_or_shutdown(&self, timeout: Duration) -> WaitStatus {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return WaitStatus::Shutdown;
            }
            if state.rescan && !state.items.is_empty() {
                return WaitStatus::WorkAvailable;
            }
            let left = deadline.map_or(timeout, |at| at.saturating_duration_since(Instant::now()));
            if left.is_zero() {
                return WaitStatus::TimedOut;
            }
            state = self
                .signal
                .wait_timeout(state, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Asks the consumer to scan again, for example after an external
    /// condition a readiness predicate observes has changed.
    pub fn reevaluate(&self) {
        let mut state = self.lock();
        state.rescan = true;
        drop(state);
        self.signal.notify_all();
    }

    /// Sets the shutdown flag and wakes every waiter.
    pub fn request_shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        drop(state);
        self.signal.notify_all();
    }

    /// Returns true once shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// Number of queued envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns true when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Removes and returns every queued envelope in insertion order.
    #[must_use = "drained envelopes are lost unless inspected"]
    pub fn drain(&self) -> Vec<CommandEnvelope> {
        self.lock().items.drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        formatter
            .debug_struct("WorkQueue")
            .field("len", &state.items.len())
            .field("shutdown", &state.shutdown)
            .finish_non_exhaustive()
    }
}

fn evaluate_readiness(envelope: &CommandEnvelope) -> bool {
    panic::catch_unwind(AssertUnwindSafe(|| envelope.is_ready())).unwrap_or_else(|_| {
        warn!(
            target: QUEUE_TARGET,
            envelope = ?envelope,
            "readiness predicate panicked; envelope left pending"
        );
        false
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::outcome::Outcome;

    const SHORT: Duration = Duration::from_millis(20);

    fn discard(_: Outcome) {}

    fn envelope(script: &str) -> CommandEnvelope {
        CommandEnvelope::new(script, discard)
    }

    fn panicking_predicate(_: &CommandEnvelope) -> bool {
        panic!("predicate failure");
    }

    #[fixture]
    fn queue() -> WorkQueue {
        WorkQueue::new()
    }

    #[rstest]
    fn pops_in_insertion_order(queue: WorkQueue) {
        queue.push(envelope("first"));
        queue.push(envelope("second"));

        let first = queue.pop_ready().expect("first selected");
        let second = queue.pop_ready().expect("second selected");

        assert_eq!(first.envelope.script(), "first");
        assert_eq!(second.envelope.script(), "second");
        assert!(queue.pop_ready().is_none());
    }

    #[rstest]
    fn reports_remaining_after_removal(queue: WorkQueue) {
        for script in ["a", "b", "c"] {
            queue.push(envelope(script));
        }

        let selected = queue.pop_ready().expect("selected");

        assert_eq!(selected.remaining, 2);
        assert_eq!(queue.len(), 2);
    }

    #[rstest]
    fn skips_envelopes_that_are_not_ready(queue: WorkQueue) {
        let gate = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&gate);
        queue.push(envelope("deferred").with_readiness(move |_| flag.load(Ordering::SeqCst)));
        queue.push(envelope("ready"));

        let overtaking = queue.pop_ready().expect("ready envelope selected");
        assert_eq!(overtaking.envelope.script(), "ready");
        assert_eq!(overtaking.remaining, 1);
        assert!(queue.pop_ready().is_none());

        gate.store(true, Ordering::SeqCst);
        let deferred = queue.pop_ready().expect("deferred envelope selected");
        assert_eq!(deferred.envelope.script(), "deferred");
        assert!(queue.is_empty());
    }

    #[rstest]
    fn panicking_predicate_counts_as_not_ready(queue: WorkQueue) {
        queue.push(envelope("broken").with_readiness(panicking_predicate));
        queue.push(envelope("healthy"));

        let selected = queue.pop_ready().expect("healthy envelope selected");

        assert_eq!(selected.envelope.script(), "healthy");
        assert_eq!(queue.len(), 1);
    }

    #[rstest]
    fn wait_returns_for_pushed_work(queue: WorkQueue) {
        queue.push(envelope("x"));
        assert_eq!(
            queue.wait_for_work_or_shutdown(SHORT),
            WaitStatus::WorkAvailable
        );
    }

    #[rstest]
    fn wait_times_out_on_empty_queue(queue: WorkQueue) {
        assert_eq!(queue.wait_for_work_or_shutdown(SHORT), WaitStatus::TimedOut);
    }

    #[rstest]
    fn wait_paces_scanned_not_ready_work(queue: WorkQueue) {
        queue.push(envelope("later").with_readiness(|_| false));
        assert!(queue.pop_ready().is_none());

        let started = Instant::now();
        let status = queue.wait_for_work_or_shutdown(SHORT);

        assert_eq!(status, WaitStatus::TimedOut);
        assert!(started.elapsed() >= SHORT);
    }

    #[rstest]
    fn reevaluate_wakes_waiter(queue: WorkQueue) {
        queue.push(envelope("later").with_readiness(|_| false));
        assert!(queue.pop_ready().is_none());

        queue.reevaluate();

        assert_eq!(
            queue.wait_for_work_or_shutdown(SHORT),
            WaitStatus::WorkAvailable
        );
    }

    #[test]
    fn shutdown_wakes_blocked_waiter() {
        let queue = Arc::new(WorkQueue::new());
        let shared = Arc::clone(&queue);
        let waiter =
            thread::spawn(move || shared.wait_for_work_or_shutdown(Duration::from_secs(30)));

        thread::sleep(SHORT);
        queue.request_shutdown();

        let status = waiter.join().expect("waiter joins");
        assert_eq!(status, WaitStatus::Shutdown);
        assert!(queue.is_shutdown());
    }

    #[rstest]
    fn shutdown_takes_precedence_over_work(queue: WorkQueue) {
        queue.push(envelope("x"));
        queue.request_shutdown();
        assert_eq!(queue.wait_for_work_or_shutdown(SHORT), WaitStatus::Shutdown);
    }

    #[rstest]
    fn nothing_is_selected_after_shutdown(queue: WorkQueue) {
        queue.push(envelope("x"));
        queue.request_shutdown();

        assert!(queue.pop_ready().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[rstest]
    fn drain_returns_pending_envelopes(queue: WorkQueue) {
        queue.push(envelope("a"));
        queue.push(envelope("b").with_readiness(|_| false));

        let pending: Vec<_> = queue
            .drain()
            .iter()
            .map(|envelope| envelope.script().to_owned())
            .collect();

        assert_eq!(pending, ["a", "b"]);
        assert!(queue.is_empty());
    }
}
