//! Error types for now-playing
//!
//! A single error enum covers every failure the pipeline can surface:
//! - Transport, server and decode failures from the record and asset sources
//! - Asset references that cannot be turned into a request URL
//! - Configuration problems detected by [`Config::validate`](crate::config::Config::validate)
//!
//! Errors are `Clone` so a terminal [`FetchState::Failure`](crate::types::FetchState) can
//! be broadcast to every subscriber and so coalesced asset fetches can hand the same
//! outcome to every waiter.

use thiserror::Error;

/// Result type alias for now-playing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for now-playing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Network or transport-level failure (connection refused, timeout, body read failure)
    #[error("transport error: {0}")]
    Transport(String),

    /// The response payload could not be decoded into the expected type
    #[error("decode error: {0}")]
    Decode(String),

    /// The remote source answered with a non-2xx status
    #[error("server error: HTTP {status}")]
    Server {
        /// HTTP status code returned by the remote source
        status: u16,
    },

    /// An asset reference that cannot be resolved to a request
    #[error("invalid asset reference: {0:?}")]
    InvalidReference(String),

    /// A request URL could not be built from the configured endpoint
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "source.base_url")
        key: Option<String>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns true if retrying the same request later might succeed.
    ///
    /// Transport failures and 5xx/429 responses are transient. Decode failures,
    /// bad references and 4xx responses are not. The crate never retries on its own;
    /// this exists so consumers can decide whether to offer a retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Server { status } => *status >= 500 || *status == 429,
            Error::Decode(_)
            | Error::InvalidReference(_)
            | Error::InvalidUrl(_)
            | Error::Config { .. }
            | Error::Other(_) => false,
        }
    }

    /// Short machine-readable code for this error, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Decode(_) => "decode",
            Error::Server { .. } => "server",
            Error::InvalidReference(_) => "invalid_reference",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Config { .. } => "config",
            Error::Other(_) => "other",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Transport(format!("request timed out: {}", e))
        } else if e.is_connect() {
            Error::Transport(format!("connection failed: {}", e))
        } else if e.is_decode() {
            Error::Decode(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}
