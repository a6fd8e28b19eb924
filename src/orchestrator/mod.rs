//! Fetch-and-enrich orchestration.
//!
//! An [`EnrichmentOrchestrator`] run fetches the listing once, resolves each
//! record's asset with the chosen [`Strategy`], sorts the result by score and
//! publishes it as the new [`FetchState`].
//!
//! ## Submodules
//! - `state` - state cell, run generations and transition broadcast
//! - `strategy` - the three enrichment fan-out strategies

mod state;
mod strategy;


use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::AssetCache;
use crate::config::Config;
use crate::decode::{ImageDecoder, TmdbJsonDecoder};
use crate::error::Result;
use crate::fetcher::{AssetFetcher, FetchStats, RecordFetcher};
use crate::network::{HttpTransport, ReqwestTransport};
use crate::types::{EnrichedRecord, FetchState, RunId, StateChange, Strategy};

use state::StateHolder;

/// Coordinates record and asset fetching and owns the published state.
///
/// Cloning is cheap; clones share the state, the cache and the fetchers.
///
/// A run moves the state to `Loading` and then to exactly one terminal state,
/// `Success` or `Failure`. When a newer run starts before an older one
/// finishes, the older run's outcome is never published; what happens to its
/// in-flight work is decided by
/// [`SupersedePolicy`](crate::config::SupersedePolicy).
#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    config: Arc<Config>,
    records: RecordFetcher,
    assets: AssetFetcher,
    state: Arc<StateHolder>,
}

impl EnrichmentOrchestrator {
    /// Create an orchestrator talking to the configured hosts over HTTP
    ///
    /// # Errors
    /// - [`Error::Config`](crate::Error::Config) if the config is invalid
    /// - [`Error::Other`](crate::Error::Other) if the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config.http)?);
        Ok(Self::with_transport(config, transport, AssetCache::new()))
    }

    /// Create an orchestrator over a custom transport and an existing cache
    ///
    /// The config is not validated here.
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        cache: AssetCache,
    ) -> Self {
        let records = RecordFetcher::new(
            transport.clone(),
            Arc::new(TmdbJsonDecoder),
            config.source.clone(),
        );
        let assets = AssetFetcher::new(transport, Arc::new(ImageDecoder), cache, &config.assets);
        Self::from_parts(config, records, assets)
    }

    /// Create an orchestrator from pre-built fetchers
    pub fn from_parts(config: Config, records: RecordFetcher, assets: AssetFetcher) -> Self {
        let state = Arc::new(StateHolder::new(config.orchestrator.event_buffer));
        Self {
            config: Arc::new(config),
            records,
            assets,
            state,
        }
    }

    /// Subscribe to state transitions
    ///
    /// Each transition is delivered once per subscriber, in the order it was
    /// published. Slow subscribers may observe `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FetchState {
        self.state.current()
    }

    /// The most recently started run, if any
    pub fn current_run(&self) -> Option<RunId> {
        self.state.current_run()
    }

    /// The config this orchestrator was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared asset cache
    pub fn cache(&self) -> &AssetCache {
        self.assets.cache()
    }

    /// The record fetcher, e.g. for single-record lookups
    pub fn record_fetcher(&self) -> &RecordFetcher {
        &self.records
    }

    /// The asset fetcher
    pub fn asset_fetcher(&self) -> &AssetFetcher {
        &self.assets
    }

    /// Asset fetch counters accumulated across runs
    pub fn stats(&self) -> FetchStats {
        self.assets.stats()
    }

    /// Run one fetch-and-enrich cycle and wait for it
    ///
    /// Returns the terminal state this run published, or `None` if a newer
    /// run superseded it first. Listing failures surface as
    /// `Some(FetchState::Failure(_))`; asset failures never do.
    pub async fn run(&self, strategy: Strategy) -> Option<FetchState> {
        let (run, cancel) = self.state.begin(self.config.orchestrator.supersede);
        self.drive(run, cancel, strategy).await
    }

    /// Start a run in the background
    ///
    /// The state is `Loading` by the time this returns, so a subsequent
    /// `trigger` is guaranteed to supersede this one.
    pub fn trigger(&self, strategy: Strategy) -> JoinHandle<Option<FetchState>> {
        let (run, cancel) = self.state.begin(self.config.orchestrator.supersede);
        let this = self.clone();
        tokio::spawn(async move { this.drive(run, cancel, strategy).await })
    }

    /// [`trigger`](Self::trigger) with the configured default strategy
    pub fn trigger_default(&self) -> JoinHandle<Option<FetchState>> {
        self.trigger(self.config.orchestrator.default_strategy)
    }

    async fn drive(
        &self,
        run: RunId,
        cancel: CancellationToken,
        strategy: Strategy,
    ) -> Option<FetchState> {
        let started = Instant::now();
        tracing::info!(run = %run, strategy = %strategy, "Starting enrichment run");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(run = %run, "Run aborted by a newer run");
                return None;
            }
            outcome = self.execute(strategy, &cancel) => outcome,
        };

        let elapsed_ms = millis(started.elapsed());
        let state = match outcome {
            Ok(records) => {
                let with_asset = records.iter().filter(|r| r.has_asset()).count();
                tracing::info!(
                    run = %run,
                    strategy = %strategy,
                    records = records.len(),
                    with_asset,
                    elapsed_ms,
                    "Enrichment run succeeded"
                );
                FetchState::Success(Arc::new(records))
            }
            Err(e) => {
                tracing::error!(run = %run, error = %e, elapsed_ms, "Enrichment run failed");
                FetchState::Failure(e)
            }
        };

        if self.state.finish(run, state.clone()) {
            Some(state)
        } else {
            tracing::debug!(run = %run, "Run superseded, dropping its result");
            None
        }
    }

    async fn execute(
        &self,
        strategy: Strategy,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichedRecord>> {
        let records = self.records.fetch_all().await?;
        let count = records.len();

        let mut enriched = match strategy {
            Strategy::TaskList => strategy::task_list(&self.assets, records, cancel).await,
            Strategy::TaskGroup => strategy::task_group(&self.assets, records, cancel).await,
            Strategy::Staged => strategy::staged(&self.assets, records, cancel).await,
        };
        debug_assert_eq!(enriched.len(), count);

        strategy::sort_by_score(&mut enriched);
        Ok(enriched)
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for EnrichmentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentOrchestrator")
            .field("default_strategy", &self.config.orchestrator.default_strategy)
            .field("supersede", &self.config.orchestrator.supersede)
            .field("current_run", &self.current_run())
            .finish_non_exhaustive()
    }
}
