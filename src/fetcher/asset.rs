//! Cached asset fetch.
//!
//! A cache hit returns without touching the network. On a miss the asset is
//! fetched, decoded and stored. In [`AssetFetchMode::Baseline`] two tasks that
//! miss on the same key at the same time both go to the network; the cache only
//! saves fetches for keys that already resolved. [`AssetFetchMode::SingleFlight`]
//! closes that gap by parking later callers on the first caller's request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::cache::AssetCache;
use crate::config::{AssetConfig, AssetFetchMode};
use crate::decode::AssetDecoder;
use crate::endpoint::asset_url;
use crate::error::Result;
use crate::network::HttpTransport;
use crate::types::Asset;

/// A fetch other callers can join while it is in flight
type InFlight = Shared<BoxFuture<'static, Result<Arc<Asset>>>>;

type InFlightTable = Mutex<HashMap<String, InFlight>>;

/// Snapshot of asset fetch counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Fetches answered from the cache
    pub cache_hits: u64,
    /// Requests sent to the asset source
    pub network_fetches: u64,
    /// Misses that joined an in-flight request instead of sending their own
    pub coalesced: u64,
    /// Fetches that ended in an error
    pub failures: u64,
}

/// Atomic counters shared by every clone of a fetcher.
#[derive(Default)]
struct FetchCounters {
    cache_hits: AtomicU64,
    network_fetches: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

/// Everything a network fetch needs. In-flight futures hold this, never the
/// in-flight table itself.
struct AssetSource {
    transport: Arc<dyn HttpTransport>,
    decoder: Arc<dyn AssetDecoder>,
    cache: AssetCache,
    image_base_url: String,
    counters: FetchCounters,
}

impl AssetSource {
    /// Resolve, request, decode and cache one asset
    async fn fetch_and_store(&self, key: &str) -> Result<Arc<Asset>> {
        let url = asset_url(&self.image_base_url, key)?;

        self.counters.network_fetches.fetch_add(1, Ordering::Relaxed);
        let response = self.transport.get(&url).await?;
        let body = response.into_success_body()?;
        let asset = Arc::new(self.decoder.decode_asset(&body)?);

        self.cache.insert(key, Arc::clone(&asset)).await;
        tracing::debug!(key, bytes = asset.len(), format = ?asset.format, "Asset fetched");
        Ok(asset)
    }
}

/// Fetches assets through the shared [`AssetCache`]
///
/// Cloning is cheap; clones share the cache, the in-flight table and the counters.
#[derive(Clone)]
pub struct AssetFetcher {
    source: Arc<AssetSource>,
    mode: AssetFetchMode,
    in_flight: Arc<InFlightTable>,
}

impl AssetFetcher {
    /// Create an asset fetcher over the given cache
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        decoder: Arc<dyn AssetDecoder>,
        cache: AssetCache,
        config: &AssetConfig,
    ) -> Self {
        Self {
            source: Arc::new(AssetSource {
                transport,
                decoder,
                cache,
                image_base_url: config.image_base_url.clone(),
                counters: FetchCounters::default(),
            }),
            mode: config.fetch_mode,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The cache this fetcher reads and populates
    pub fn cache(&self) -> &AssetCache {
        &self.source.cache
    }

    /// Configured duplicate-suppression mode
    pub fn mode(&self) -> AssetFetchMode {
        self.mode
    }

    /// Current counter values
    pub fn stats(&self) -> FetchStats {
        let counters = &self.source.counters;
        FetchStats {
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            network_fetches: counters.network_fetches.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Return the asset for `key`, from the cache or the network
    ///
    /// # Errors
    /// - [`Error::InvalidReference`](crate::Error::InvalidReference) if the key does not resolve to a URL
    /// - [`Error::Transport`](crate::Error::Transport) if the request fails
    /// - [`Error::Server`](crate::Error::Server) for a non-2xx response
    /// - [`Error::Decode`](crate::Error::Decode) if the payload is not an image
    pub async fn fetch(&self, key: &str) -> Result<Arc<Asset>> {
        if let Some(asset) = self.source.cache.lookup(key).await {
            self.source.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "Asset cache hit");
            return Ok(asset);
        }

        tracing::debug!(key, mode = ?self.mode, "Asset cache miss");
        let result = match self.mode {
            AssetFetchMode::Baseline => self.source.fetch_and_store(key).await,
            AssetFetchMode::SingleFlight => self.fetch_coalesced(key).await,
        };

        if result.is_err() {
            self.source.counters.failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Join the in-flight request for `key`, or start one
    async fn fetch_coalesced(&self, key: &str) -> Result<Arc<Asset>> {
        let fetch = {
            let mut in_flight = lock_table(&self.in_flight);

            match in_flight.get(key) {
                Some(existing) => {
                    self.source.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key, "Joining in-flight asset fetch");
                    existing.clone()
                }
                None => {
                    let fetch = self.start_fetch(key);
                    in_flight.insert(key.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        let mut waiter = Waiter {
            table: &self.in_flight,
            key,
            fetch,
        };
        (&mut waiter.fetch).await
    }

    fn start_fetch(&self, key: &str) -> InFlight {
        let source = Arc::clone(&self.source);
        let table = Arc::downgrade(&self.in_flight);
        let key = key.to_string();

        async move {
            // A previous leader stores into the cache before it leaves the table,
            // so the key may have resolved since the caller's lookup.
            let result = match source.cache.lookup(&key).await {
                Some(asset) => {
                    source.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    Ok(asset)
                }
                None => source.fetch_and_store(&key).await,
            };
            if let Some(table) = Weak::upgrade(&table) {
                lock_table(&table).remove(&key);
            }
            result
        }
        .boxed()
        .shared()
    }
}

// No critical section awaits or panics midway, so a poisoned table is still consistent
fn lock_table(table: &InFlightTable) -> MutexGuard<'_, HashMap<String, InFlight>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A caller parked on an in-flight fetch
///
/// When the last caller gives up before the fetch completes, the entry is
/// removed, which drops the half-polled request.
struct Waiter<'a> {
    table: &'a InFlightTable,
    key: &'a str,
    fetch: InFlight,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock_table(self.table);
        let Some(entry) = in_flight.get(self.key) else {
            return;
        };
        // The table's handle plus ours; `None` once this handle has completed
        if entry.ptr_eq(&self.fetch) && self.fetch.strong_count() == Some(2) {
            in_flight.remove(self.key);
            tracing::debug!(key = self.key, "Abandoned in-flight asset fetch");
        }
    }
}
