//! Shared test helpers: a scripted HTTP transport and fixture builders.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use url::Url;

use crate::cache::AssetCache;
use crate::config::{AssetFetchMode, Config, SupersedePolicy};
use crate::error::{Error, Result};
use crate::network::{HttpResponse, HttpTransport};
use crate::orchestrator::EnrichmentOrchestrator;

/// Path of the listing endpoint under [`test_config`]'s base URL
pub(crate) const LISTING_PATH: &str = "/3/movie/now_playing";

/// Request path of an asset reference under [`test_config`]'s image base URL
pub(crate) fn asset_path(key: &str) -> String {
    format!("/t/p/w500{}", key)
}

/// Config pointing at fake hosts; requests are answered by [`MockTransport`]
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.source.base_url = "http://records.test/3".to_string();
    config.source.api_key = "test-key".to_string();
    config.assets.image_base_url = "http://images.test/t/p/w500".to_string();
    config
}

/// Config with the given fetch mode and supersede policy
pub(crate) fn test_config_with(mode: AssetFetchMode, supersede: SupersedePolicy) -> Config {
    let mut config = test_config();
    config.assets.fetch_mode = mode;
    config.orchestrator.supersede = supersede;
    config
}

/// A minimal JPEG-signed payload, distinguishable by `tag`
pub(crate) fn jpeg(tag: u8) -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, tag]
}

/// Listing JSON for `(id, score, poster_path)` triples, in the given order
pub(crate) fn listing_json(records: &[(i64, f64, Option<&str>)]) -> String {
    let results: Vec<serde_json::Value> = records
        .iter()
        .map(|(id, score, poster)| {
            serde_json::json!({
                "id": id,
                "title": format!("Movie {}", id),
                "overview": format!("Overview {}", id),
                "poster_path": poster,
                "vote_average": score,
                "release_date": "2024-11-27",
            })
        })
        .collect();
    serde_json::json!({ "page": 1, "results": results }).to_string()
}

/// Orchestrator wired to a mock transport with a fresh cache
pub(crate) fn orchestrator(transport: Arc<MockTransport>, config: Config) -> EnrichmentOrchestrator {
    EnrichmentOrchestrator::with_transport(config, transport, AssetCache::new())
}

#[derive(Clone)]
struct Route {
    response: Result<HttpResponse>,
    delay: Duration,
}

/// Scripted [`HttpTransport`] keyed by URL path.
///
/// Unscripted paths answer 404. Every request is recorded, and the number of
/// requests in progress at once is tracked for concurrency assertions.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<Url>>,
    in_progress: AtomicUsize,
    max_in_progress: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn route(self, path: impl Into<String>, route: Route) -> Self {
        self.routes.lock().unwrap().insert(path.into(), route);
        self
    }

    pub(crate) fn respond(
        self,
        path: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.respond_delayed(path, status, body, Duration::ZERO)
    }

    pub(crate) fn respond_delayed(
        self,
        path: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
        delay: Duration,
    ) -> Self {
        self.route(
            path,
            Route {
                response: Ok(HttpResponse::new(status, body)),
                delay,
            },
        )
    }

    pub(crate) fn fail(self, path: impl Into<String>, error: Error) -> Self {
        self.route(
            path,
            Route {
                response: Err(error),
                delay: Duration::ZERO,
            },
        )
    }

    /// Replace a route's response after construction, keeping its delay
    pub(crate) fn set_response(&self, path: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) {
        let path = path.into();
        let delay = self
            .routes
            .lock()
            .unwrap()
            .get(&path)
            .map(|r| r.delay)
            .unwrap_or_default();
        self.set_response_delayed(path, status, body, delay);
    }

    /// Replace a route's response and delay after construction
    pub(crate) fn set_response_delayed(
        &self,
        path: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
        delay: Duration,
    ) {
        self.routes.lock().unwrap().insert(
            path.into(),
            Route {
                response: Ok(HttpResponse::new(status, body)),
                delay,
            },
        );
    }

    pub(crate) fn request_count(&self, path: impl AsRef<str>) -> usize {
        let path = path.as_ref();
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.path() == path)
            .count()
    }

    pub(crate) fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requested_urls(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of requests that were in progress simultaneously
    pub(crate) fn max_in_progress(&self) -> usize {
        self.max_in_progress.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.clone());
        let route = self.routes.lock().unwrap().get(url.path()).cloned();

        let now = self.in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_progress.fetch_max(now, Ordering::SeqCst);

        let result = match route {
            Some(route) => {
                if !route.delay.is_zero() {
                    tokio::time::sleep(route.delay).await;
                }
                route.response
            }
            None => Ok(HttpResponse::new(404, Vec::new())),
        };

        self.in_progress.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
