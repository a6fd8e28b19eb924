//! Now playing example
//!
//! This example demonstrates the core functionality of now-playing:
//! - Configuring the listing source
//! - Subscribing to state transitions
//! - Running each enrichment strategy and timing it
//! - Reusing the shared poster cache across runs
//!
//! ```bash
//! TMDB_API_KEY=... cargo run --example now_playing -- staged
//! ```

use std::time::Instant;

use now_playing::{AssetFetchMode, Config, EnrichmentOrchestrator, FetchState, Strategy};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut config = Config::default();
    config.source.api_key = std::env::var("TMDB_API_KEY")?;
    config.assets.fetch_mode = AssetFetchMode::SingleFlight;

    // Strategies to run, from the command line or all of them
    let strategies: Vec<Strategy> = match std::env::args().nth(1) {
        Some(name) => vec![name.parse()?],
        None => Strategy::ALL.to_vec(),
    };

    let orchestrator = EnrichmentOrchestrator::new(config)?;

    let mut changes = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(change) = changes.recv().await {
            println!("[run {}] {}", change.run, change.state.name());
        }
    });

    for strategy in strategies {
        let started = Instant::now();
        let state = orchestrator.run(strategy).await;
        let elapsed = started.elapsed();

        match state {
            Some(FetchState::Success(records)) => {
                println!(
                    "\n{} finished in {:.0?} ({} records)",
                    strategy,
                    elapsed,
                    records.len()
                );
                for record in records.iter().take(10) {
                    let poster = match &record.asset {
                        Some(asset) => format!("{} bytes {}", asset.len(), asset.format.mime_type()),
                        None => "no poster".to_string(),
                    };
                    println!(
                        "  {:>4.1}  {:<40}  {}",
                        record.score(),
                        record.record.title,
                        poster
                    );
                }
            }
            Some(FetchState::Failure(e)) => {
                eprintln!("{} failed after {:.0?}: {}", strategy, elapsed, e);
            }
            Some(other) => eprintln!("{} ended in unexpected state {}", strategy, other.name()),
            None => eprintln!("{} was superseded", strategy),
        }
    }

    let stats = orchestrator.stats();
    println!(
        "\nposter cache: {} entries, {} hits, {} fetches, {} coalesced, {} failures",
        orchestrator.cache().len().await,
        stats.cache_hits,
        stats.network_fetches,
        stats.coalesced,
        stats.failures
    );

    Ok(())
}
