//! Primary record fetch.

use std::sync::Arc;

use crate::config::SourceConfig;
use crate::decode::RecordDecoder;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::network::HttpTransport;
use crate::types::{Record, RecordId};

/// Fetches and decodes records from the listing source. Holds no state between calls.
#[derive(Clone)]
pub struct RecordFetcher {
    transport: Arc<dyn HttpTransport>,
    decoder: Arc<dyn RecordDecoder>,
    source: Arc<SourceConfig>,
}

impl RecordFetcher {
    /// Create a record fetcher
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        decoder: Arc<dyn RecordDecoder>,
        source: SourceConfig,
    ) -> Self {
        Self {
            transport,
            decoder,
            source: Arc::new(source),
        }
    }

    /// Fetch the configured listing page
    ///
    /// # Errors
    /// - [`Error::Transport`](crate::Error::Transport) if the request fails
    /// - [`Error::Server`](crate::Error::Server) for a non-2xx response
    /// - [`Error::Decode`](crate::Error::Decode) if the body is not a listing
    pub async fn fetch_all(&self) -> Result<Vec<Record>> {
        let endpoint = Endpoint::NowPlaying {
            page: self.source.page,
        };
        let body = self.get(endpoint).await?;
        let records = self.decoder.decode_records(&body)?;

        tracing::debug!(count = records.len(), "Fetched record listing");
        Ok(records)
    }

    /// Fetch a single record by id
    pub async fn fetch_one(&self, id: RecordId) -> Result<Record> {
        let body = self.get(Endpoint::MovieDetail { id }).await?;
        self.decoder.decode_record(&body)
    }

    async fn get(&self, endpoint: Endpoint) -> Result<Vec<u8>> {
        let url = endpoint.url(&self.source)?;
        // Path only: the query carries the API key
        let path = endpoint.path();

        let response = self.transport.get(&url).await.inspect_err(|e| {
            tracing::warn!(path = %path, error = %e, "Record request failed");
        })?;

        response.into_success_body().inspect_err(|e| {
            tracing::warn!(path = %path, error = %e, "Record source returned an error status");
        })
    }
}
