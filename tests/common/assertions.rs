//! Custom test assertions for orchestrator runs

use std::time::Duration;

use now_playing::{EnrichmentOrchestrator, FetchState, RunId};
use tokio::sync::broadcast::error::RecvError;

/// Result of waiting for a run to finish
#[derive(Debug)]
pub enum WaitResult {
    /// The run published a terminal state
    Finished(FetchState),
    /// Timeout waiting for a terminal state
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait until `run` publishes a terminal state
///
/// Subscribe before triggering the run, otherwise its transitions may be missed.
pub async fn wait_for_terminal(
    events: &mut tokio::sync::broadcast::Receiver<now_playing::StateChange>,
    run: RunId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(change) if change.run == run && change.state.is_terminal() => {
                    return WaitResult::Finished(change.state);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Record ids of a successful state, in published order
///
/// Panics if the state is not `Success`.
pub fn success_ids(state: &FetchState) -> Vec<i64> {
    state
        .records()
        .unwrap_or_else(|| panic!("expected Success, got {}", state.name()))
        .iter()
        .map(|r| r.id().get())
        .collect()
}

/// Ids of the records that resolved an asset
pub fn ids_with_asset(state: &FetchState) -> Vec<i64> {
    state
        .records()
        .unwrap_or_default()
        .iter()
        .filter(|r| r.has_asset())
        .map(|r| r.id().get())
        .collect()
}

/// Panic unless the orchestrator's current state is terminal
pub fn assert_terminal(orchestrator: &EnrichmentOrchestrator) {
    let state = orchestrator.state();
    assert!(
        state.is_terminal(),
        "expected terminal state, got {}",
        state.name()
    );
}
