//! State cell and transition broadcast.
//!
//! The current [`FetchState`], the run generation and the active run's
//! cancellation token sit behind one mutex. Every transition updates the cell
//! and sends on the broadcast channel under that lock, so subscribers observe
//! transitions in the same order as the cell.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::SupersedePolicy;
use crate::types::{FetchState, RunId, StateChange};

struct Inner {
    state: FetchState,
    generation: u64,
    active: Option<CancellationToken>,
}

/// Last-write-wins state holder with generation tracking
pub(crate) struct StateHolder {
    inner: Mutex<Inner>,
    event_tx: broadcast::Sender<StateChange>,
}

impl StateHolder {
    pub(crate) fn new(event_buffer: usize) -> Self {
        let (event_tx, _rx) = broadcast::channel(event_buffer.max(1));
        Self {
            inner: Mutex::new(Inner {
                state: FetchState::Idle,
                generation: 0,
                active: None,
            }),
            event_tx,
        }
    }

    // Every critical section leaves `Inner` consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.event_tx.subscribe()
    }

    pub(crate) fn current(&self) -> FetchState {
        self.lock().state.clone()
    }

    pub(crate) fn current_run(&self) -> Option<RunId> {
        let generation = self.lock().generation;
        (generation > 0).then_some(RunId(generation))
    }

    /// Start a new run: bump the generation and publish `Loading`
    ///
    /// Under [`SupersedePolicy::Abort`] the previous run's token is cancelled.
    pub(crate) fn begin(&self, policy: SupersedePolicy) -> (RunId, CancellationToken) {
        let token = CancellationToken::new();
        let mut inner = self.lock();

        inner.generation += 1;
        let run = RunId(inner.generation);

        if let Some(previous) = inner.active.replace(token.clone()) {
            if policy == SupersedePolicy::Abort && !previous.is_cancelled() {
                tracing::debug!(run = run.0, "Cancelling superseded run");
                previous.cancel();
            }
        }

        inner.state = FetchState::Loading;
        self.send(run, FetchState::Loading);
        (run, token)
    }

    /// Publish a terminal state if `run` is still the latest run
    ///
    /// Returns false (and changes nothing) when a newer run has started.
    pub(crate) fn finish(&self, run: RunId, state: FetchState) -> bool {
        let mut inner = self.lock();
        if inner.generation != run.0 {
            return false;
        }

        inner.active = None;
        inner.state = state.clone();
        self.send(run, state);
        true
    }

    fn send(&self, run: RunId, state: FetchState) {
        // No subscribers is fine; the cell still holds the state
        self.event_tx.send(StateChange { run, state }).ok();
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;

    #[test]
    fn starts_idle_with_no_run() {
        let holder = StateHolder::new(8);
        assert!(matches!(holder.current(), FetchState::Idle));
        assert_eq!(holder.current_run(), None);
    }

    #[tokio::test]
    async fn begin_then_finish_publishes_two_transitions() {
        let holder = StateHolder::new(8);
        let mut rx = holder.subscribe();

        let (run, _token) = holder.begin(SupersedePolicy::DropStale);
        assert!(holder.finish(run, FetchState::Success(Arc::new(Vec::new()))));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.run, run);
        assert!(matches!(first.state, FetchState::Loading));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.state, FetchState::Success(_)));
        assert!(matches!(holder.current(), FetchState::Success(_)));
    }

    #[test]
    fn stale_finish_is_dropped() {
        let holder = StateHolder::new(8);
        let (old, _) = holder.begin(SupersedePolicy::DropStale);
        let (new, _) = holder.begin(SupersedePolicy::DropStale);

        assert!(!holder.finish(old, FetchState::Failure(Error::Server { status: 500 })));
        assert!(matches!(holder.current(), FetchState::Loading));

        assert!(holder.finish(new, FetchState::Success(Arc::new(Vec::new()))));
        assert_eq!(holder.current_run(), Some(new));
    }

    #[test]
    fn abort_policy_cancels_previous_token() {
        let holder = StateHolder::new(8);
        let (_, first) = holder.begin(SupersedePolicy::Abort);
        let (_, second) = holder.begin(SupersedePolicy::Abort);

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn drop_stale_policy_leaves_previous_token_alone() {
        let holder = StateHolder::new(8);
        let (_, first) = holder.begin(SupersedePolicy::DropStale);
        holder.begin(SupersedePolicy::DropStale);

        assert!(!first.is_cancelled());
    }

    #[test]
    fn zero_buffer_is_clamped() {
        // broadcast::channel(0) panics; the holder must not
        let holder = StateHolder::new(0);
        holder.begin(SupersedePolicy::DropStale);
    }
}
