//! Future-like handle over one in-flight execution.
//!
//! The handle wraps a single-assignment outcome cell guarded by a mutex
//! and condition variable. The worker resolves the cell exactly once;
//! later resolution attempts are no-ops. `Pending` is the only state from
//! which any other state is reachable, and `Done` is terminal.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tokio::task::AbortHandle;

use super::stats::ClientStats;

/// Terminal outcome of one execution.
pub(crate) enum Outcome<T, E> {
    Resolved(T),
    Failed(E),
    Cancelled,
    /// The handler panicked; the payload is re-raised on the thread that
    /// collects the outcome.
    Panicked(Box<dyn Any + Send>),
}

enum Phase<T, E> {
    /// Transport I/O may still be in flight; cancellation can win.
    Pending,
    /// Handler invocation has been claimed; it runs to completion.
    Running,
    Done(Outcome<T, E>),
    /// The outcome was collected by `get`/`checked_get`.
    Taken,
}

/// Outcome cell shared between the worker, the handle, and drop guards.
pub(crate) struct Shared<T, E> {
    phase: Mutex<Phase<T, E>>,
    done: Condvar,
    stats: Arc<ClientStats>,
}

impl<T, E> Shared<T, E> {
    pub(crate) fn new(stats: Arc<ClientStats>) -> Self {
        Self {
            phase: Mutex::new(Phase::Pending),
            done: Condvar::new(),
            stats,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Phase<T, E>> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the handler invocation slot. Returns false if the execution
    /// already reached a terminal state (cancellation won the race), in
    /// which case the handler must not be invoked.
    pub(crate) fn begin_handler(&self) -> bool {
        let mut phase = self.lock();
        match *phase {
            Phase::Pending => {
                *phase = Phase::Running;
                true
            }
            _ => false,
        }
    }

    /// Resolve the cell. Idempotent: the first resolution wins and later
    /// calls are no-ops.
    pub(crate) fn finish(&self, outcome: Outcome<T, E>) {
        let mut phase = self.lock();
        if matches!(*phase, Phase::Done(_) | Phase::Taken) {
            return;
        }
        match outcome {
            Outcome::Resolved(_) => self.stats.record_success(),
            Outcome::Failed(_) | Outcome::Panicked(_) => self.stats.record_failure(),
            Outcome::Cancelled => self.stats.record_cancel(),
        }
        *phase = Phase::Done(outcome);
        drop(phase);
        self.done.notify_all();
    }

    /// Cancellation requested through the handle: only a still-pending
    /// execution can be cancelled.
    fn cancel(&self) -> bool {
        let mut phase = self.lock();
        if matches!(*phase, Phase::Pending) {
            self.stats.record_cancel();
            *phase = Phase::Done(Outcome::Cancelled);
            drop(phase);
            self.done.notify_all();
            true
        } else {
            false
        }
    }

    /// Used by drop guards when a worker task is torn down mid-flight
    /// (runtime shutdown, task abort): force a terminal state so waiters
    /// are never stranded. No-op once resolved.
    pub(crate) fn abandon(&self) {
        self.finish(Outcome::Cancelled);
    }

    fn is_finished(&self) -> bool {
        matches!(*self.lock(), Phase::Done(_) | Phase::Taken)
    }

    fn wait_take(&self) -> Outcome<T, E> {
        let mut phase = self.lock();
        loop {
            match std::mem::replace(&mut *phase, Phase::Taken) {
                Phase::Done(outcome) => return outcome,
                other => *phase = other,
            }
            phase = self
                .done
                .wait(phase)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Resolves the shared cell to cancelled if its worker is dropped before
/// resolution. Disarmed at handoff points where another owner takes over
/// responsibility for resolving.
pub(crate) struct CompletionGuard<T, E> {
    shared: Arc<Shared<T, E>>,
    armed: bool,
}

impl<T, E> CompletionGuard<T, E> {
    pub(crate) fn new(shared: Arc<Shared<T, E>>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T, E> Drop for CompletionGuard<T, E> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.abandon();
        }
    }
}

/// The execution was cancelled before a result could be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("execution was cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Failure outcome reported by [`ExecutionHandle::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError<E> {
    /// The handler produced this application error, either from its
    /// success-path `handle` failing or from `handle_error` mapping a
    /// transport failure.
    Failed(E),
    /// The execution was cancelled before completion.
    Cancelled,
}

impl<E: fmt::Display> fmt::Display for ExecutionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Failed(e) => write!(f, "execution failed: {e}"),
            ExecutionError::Cancelled => Cancelled.fmt(f),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ExecutionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutionError::Failed(e) => Some(e),
            ExecutionError::Cancelled => None,
        }
    }
}

/// Handle over an in-flight or completed execution.
///
/// The blocking accessors must be called from outside the client's
/// runtime (any plain thread); the thread that called
/// [`execute`](crate::HttpClient::execute) is the usual place.
pub struct ExecutionHandle<T, E> {
    shared: Arc<Shared<T, E>>,
    abort: AbortHandle,
}

impl<T, E> ExecutionHandle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(shared: Arc<Shared<T, E>>, abort: AbortHandle) -> Self {
        Self { shared, abort }
    }

    /// Block until the execution reaches a terminal state and collect it.
    ///
    /// A panic raised inside the handler is resumed on the calling thread.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::Failed`] carries the handler-produced error;
    /// [`ExecutionError::Cancelled`] reports a cancelled execution.
    pub fn get(self) -> Result<T, ExecutionError<E>> {
        match self.shared.wait_take() {
            Outcome::Resolved(value) => Ok(value),
            Outcome::Failed(error) => Err(ExecutionError::Failed(error)),
            Outcome::Cancelled => Err(ExecutionError::Cancelled),
            Outcome::Panicked(payload) => std::panic::resume_unwind(payload),
        }
    }

    /// Like [`get`](Self::get), but re-raises the stored application error
    /// directly, preserving its type end-to-end. Cancellation converts
    /// through `E: From<Cancelled>`.
    ///
    /// # Errors
    ///
    /// The handler-produced `E`, exactly as the handler returned it.
    pub fn checked_get(self) -> Result<T, E>
    where
        E: From<Cancelled>,
    {
        match self.get() {
            Ok(value) => Ok(value),
            Err(ExecutionError::Failed(error)) => Err(error),
            Err(ExecutionError::Cancelled) => Err(E::from(Cancelled)),
        }
    }

    /// Request cancellation. Returns true iff the execution was still
    /// pending: the handle resolves to cancelled, the in-flight transport
    /// task is aborted best-effort, and the handler will never run. Once
    /// handler invocation has begun, or the handle is already terminal,
    /// this is a no-op returning false.
    pub fn cancel(&self) -> bool {
        if self.shared.cancel() {
            self.abort.abort();
            tracing::debug!("execution cancelled while pending");
            true
        } else {
            false
        }
    }

    /// True once the execution has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }
}

impl<T, E> fmt::Debug for ExecutionHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("finished", &self.shared.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shared() -> Arc<Shared<u32, String>> {
        Arc::new(Shared::new(Arc::new(ClientStats::default())))
    }

    #[test]
    fn resolution_is_idempotent() {
        let cell = shared();
        assert!(cell.begin_handler());
        cell.finish(Outcome::Resolved(1));
        cell.finish(Outcome::Resolved(2));
        assert!(matches!(cell.wait_take(), Outcome::Resolved(1)));
    }

    #[test]
    fn cancel_wins_only_while_pending() {
        let cell = shared();
        assert!(cell.cancel());
        // A second cancel and a late worker resolution are both no-ops.
        assert!(!cell.cancel());
        cell.finish(Outcome::Resolved(1));
        assert!(matches!(cell.wait_take(), Outcome::Cancelled));
    }

    #[test]
    fn handler_claim_blocks_cancellation() {
        let cell = shared();
        assert!(cell.begin_handler());
        assert!(!cell.cancel());
        cell.finish(Outcome::Failed("boom".to_owned()));
        assert!(matches!(cell.wait_take(), Outcome::Failed(_)));
    }

    #[test]
    fn claim_is_refused_after_cancellation() {
        let cell = shared();
        assert!(cell.cancel());
        assert!(!cell.begin_handler());
    }

    #[test]
    fn abandon_resolves_even_while_running() {
        let cell = shared();
        assert!(cell.begin_handler());
        cell.abandon();
        assert!(matches!(cell.wait_take(), Outcome::Cancelled));
    }

    #[test]
    fn wait_blocks_until_resolution() {
        let cell = shared();
        let waiter = {
            let cell = Arc::clone(&cell);
            std::thread::spawn(move || cell.wait_take())
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(!cell.is_finished());
        cell.begin_handler();
        cell.finish(Outcome::Resolved(7));
        assert!(matches!(waiter.join().expect("join"), Outcome::Resolved(7)));
    }

    #[test]
    fn disarmed_guard_leaves_cell_pending() {
        let cell = shared();
        let mut guard = CompletionGuard::new(Arc::clone(&cell));
        guard.disarm();
        drop(guard);
        assert!(!cell.is_finished());
    }

    #[test]
    fn armed_guard_abandons_on_drop() {
        let cell = shared();
        drop(CompletionGuard::new(Arc::clone(&cell)));
        assert!(matches!(cell.wait_take(), Outcome::Cancelled));
    }
}
