//! Configuration types for now-playing

use crate::error::{Error, Result};
use crate::types::Strategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Primary record source (the now-playing listing endpoint)
///
/// The query parameters are forwarded verbatim; the pipeline never interprets them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// API base URL (default: "https://api.themoviedb.org/3")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as the `api_key` query parameter
    #[serde(default)]
    pub api_key: String,

    /// Response language (default: "ko-KR")
    #[serde(default = "default_language")]
    pub language: String,

    /// Release region (default: "KR")
    #[serde(default = "default_region")]
    pub region: String,

    /// Listing page to request (default: 1)
    #[serde(default = "default_page")]
    pub page: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            language: default_language(),
            region: default_region(),
            page: default_page(),
        }
    }
}

/// How concurrent cache misses for the same asset are handled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetFetchMode {
    /// Every miss performs its own network fetch, even if an identical fetch is in flight
    #[default]
    Baseline,
    /// Concurrent misses for the same key share a single in-flight fetch
    SingleFlight,
}

/// Secondary asset source (poster images)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Prefix joined with each asset reference (default: "https://image.tmdb.org/t/p/w500")
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// Duplicate suppression for concurrent misses (default: baseline)
    #[serde(default)]
    pub fetch_mode: AssetFetchMode,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            image_base_url: default_image_base_url(),
            fetch_mode: AssetFetchMode::default(),
        }
    }
}

/// HTTP client settings for the bundled reqwest transport
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header (default: "now-playing/<version>")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// What happens to a run that is still in flight when a newer run starts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupersedePolicy {
    /// Let the old run finish (its asset fetches still warm the cache) and drop its result
    #[default]
    DropStale,
    /// Cancel the old run; outstanding enrichment tasks it owns are aborted
    Abort,
}

/// Orchestrator behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Strategy used by [`trigger_default`](crate::orchestrator::EnrichmentOrchestrator::trigger_default)
    /// (default: staged)
    #[serde(default = "default_strategy")]
    pub default_strategy: Strategy,

    /// Handling of superseded runs (default: drop_stale)
    #[serde(default)]
    pub supersede: SupersedePolicy,

    /// Capacity of the state-change broadcast channel (default: 64)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            supersede: SupersedePolicy::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Main configuration
///
/// Every field has a default, so `Config::default()` only needs an API key to be
/// usable against the real service.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Primary record source
    #[serde(default)]
    pub source: SourceConfig,

    /// Asset source and fetch mode
    #[serde(default)]
    pub assets: AssetConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Orchestrator behavior
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Check settings that would otherwise only fail at request time
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.source.base_url, e),
            key: Some("source.base_url".to_string()),
        })?;

        url::Url::parse(&self.assets.image_base_url).map_err(|e| Error::Config {
            message: format!(
                "invalid image base URL '{}': {}",
                self.assets.image_base_url, e
            ),
            key: Some("assets.image_base_url".to_string()),
        })?;

        if self.orchestrator.event_buffer == 0 {
            return Err(Error::Config {
                message: "event buffer must be at least 1".to_string(),
                key: Some("orchestrator.event_buffer".to_string()),
            });
        }

        if self.http.timeout.is_zero() {
            return Err(Error::Config {
                message: "HTTP timeout must be non-zero".to_string(),
                key: Some("http.timeout".to_string()),
            });
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_language() -> String {
    "ko-KR".to_string()
}

fn default_region() -> String {
    "KR".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("now-playing/{}", env!("CARGO_PKG_VERSION"))
}

fn default_strategy() -> Strategy {
    Strategy::Staged
}

fn default_event_buffer() -> usize {
    64
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
