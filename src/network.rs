//! HTTP transport abstraction.
//!
//! The pipeline only ever issues `GET` requests and needs the status code and
//! body bytes back. [`HttpTransport`] is that capability; [`ReqwestTransport`] is
//! the production implementation and tests substitute scripted transports.

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use url::Url;

/// Status and body of a completed HTTP exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response from its parts
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Return the body for a 2xx response, or [`Error::Server`] otherwise
    pub fn into_success_body(self) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::Server {
                status: self.status,
            })
        }
    }
}

/// Abstraction over HTTP fetching, enabling testability.
///
/// Implementations report transport-level failures as [`Error::Transport`] and
/// return every completed exchange as `Ok`, whatever its status. Timeouts belong
/// to the implementation.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a `GET` request
    async fn get(&self, url: &Url) -> Result<HttpResponse>;
}

/// Production [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the configured timeout and user agent
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            Error::Transport(format!("Failed to read response body: {}", e))
        })?;

        tracing::trace!(status, bytes = body.len(), "HTTP response received");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
