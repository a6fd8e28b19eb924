//! Shared, deduplicating asset cache.
//!
//! Maps an asset reference to its decoded [`Asset`]. A single async `RwLock`
//! guards the map, so every lookup observes either the state before or after
//! a given insert, never a partial entry. Entries are never evicted; the cache
//! lives as long as its owner and is populated lazily by
//! [`AssetFetcher`](crate::fetcher::AssetFetcher).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::Asset;

/// Concurrency-safe map from asset reference to decoded asset
///
/// Cloning is cheap and yields a handle to the same underlying store.
#[derive(Clone, Default)]
pub struct AssetCache {
    entries: Arc<RwLock<HashMap<String, Arc<Asset>>>>,
}

impl AssetCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached asset
    pub async fn lookup(&self, key: &str) -> Option<Arc<Asset>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store an asset, replacing any previous entry for the key
    ///
    /// Racing inserts for the same key resolve last-writer-wins; payloads for one
    /// key are expected to be equivalent.
    pub async fn insert(&self, key: impl Into<String>, asset: Arc<Asset>) {
        self.entries.write().await.insert(key.into(), asset);
    }

    /// Remove one entry, returning it if present
    pub async fn remove(&self, key: &str) -> Option<Arc<Asset>> {
        self.entries.write().await.remove(key)
    }

    /// Whether an entry exists for the key
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Drop every entry
    ///
    /// The map is swapped for a fresh one under the write lock, so concurrent
    /// lookups see either the full old contents or an empty cache.
    pub async fn clear(&self) {
        let old = std::mem::take(&mut *self.entries.write().await);
        tracing::debug!(entries = old.len(), "Asset cache cleared");
    }

    /// Number of cached assets
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no assets
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache").finish_non_exhaustive()
    }
}
