//! # now-playing
//!
//! Concurrent fetch-and-enrich library for a "now playing" movie listing.
//!
//! One run fetches the primary listing, resolves each record's poster through a
//! shared in-memory cache, sorts the result by score and publishes it as an
//! observable [`FetchState`].
//!
//! ## Design
//!
//! - **Failure isolation** - a failed poster never fails the run; the record is kept without it
//! - **Pluggable strategies** - [`Strategy::TaskList`], [`Strategy::TaskGroup`] and
//!   [`Strategy::Staged`] produce identical output with different concurrency profiles
//! - **Event-driven** - consumers subscribe to state transitions, no polling required
//! - **Latest run wins** - a superseded run never overwrites a newer run's state
//!
//! ## Quick Start
//!
//! ```no_run
//! use now_playing::{Config, EnrichmentOrchestrator, FetchState, Strategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.source.api_key = std::env::var("TMDB_API_KEY")?;
//!
//!     let orchestrator = EnrichmentOrchestrator::new(config)?;
//!
//!     // Subscribe to state transitions
//!     let mut changes = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(change) = changes.recv().await {
//!             println!("run {} -> {}", change.run, change.state.name());
//!         }
//!     });
//!
//!     if let Some(FetchState::Success(records)) = orchestrator.run(Strategy::Staged).await {
//!         for record in records.iter() {
//!             println!("{:>4.1}  {}", record.score(), record.record.title);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Shared in-memory asset cache
pub mod cache;
/// Configuration types
pub mod config;
/// Record and asset payload decoding
pub mod decode;
/// Remote endpoint and URL construction
pub mod endpoint;
/// Error types
pub mod error;
/// Record and asset fetchers
pub mod fetcher;
/// HTTP transport abstraction
pub mod network;
/// Fetch-and-enrich orchestration
pub mod orchestrator;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use cache::AssetCache;
pub use config::{
    AssetConfig, AssetFetchMode, Config, HttpConfig, OrchestratorConfig, SourceConfig,
    SupersedePolicy,
};
pub use decode::{AssetDecoder, ImageDecoder, RecordDecoder, TmdbJsonDecoder};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use fetcher::{AssetFetcher, FetchStats, RecordFetcher};
pub use network::{HttpResponse, HttpTransport, ReqwestTransport};
pub use orchestrator::EnrichmentOrchestrator;
pub use types::{
    Asset, AssetFormat, EnrichedRecord, FetchState, Record, RecordId, RunId, StateChange, Strategy,
};
