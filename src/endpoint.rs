//! Request URLs for the record source.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::types::RecordId;
use url::Url;

/// Record-source endpoints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Movies currently in theaters
    NowPlaying {
        /// Listing page (1-based)
        page: u32,
    },
    /// A single movie
    MovieDetail {
        /// Movie identifier
        id: RecordId,
    },
}

impl Endpoint {
    /// Path below the API base URL
    pub fn path(&self) -> String {
        match self {
            Endpoint::NowPlaying { .. } => "/movie/now_playing".to_string(),
            Endpoint::MovieDetail { id } => format!("/movie/{}", id),
        }
    }

    /// Query parameters, in a stable order
    pub fn query(&self, source: &SourceConfig) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", source.api_key.clone()),
            ("language", source.language.clone()),
            ("region", source.region.clone()),
        ];
        if let Endpoint::NowPlaying { page } = self {
            params.push(("page", page.to_string()));
        }
        params
    }

    /// Build the full request URL
    ///
    /// The path is appended to the base URL verbatim, so a base with its own path
    /// prefix (such as `/3`) keeps it.
    pub fn url(&self, source: &SourceConfig) -> Result<Url> {
        let raw = format!("{}{}", source.base_url.trim_end_matches('/'), self.path());
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::InvalidUrl(format!("'{}': {}", raw, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in self.query(source) {
                pairs.append_pair(name, &value);
            }
        }

        Ok(url)
    }
}

/// Resolve an asset reference against the image base URL
///
/// References are path fragments such as `/abc.jpg`. Empty references and
/// references containing whitespace or control characters do not name an asset.
pub fn asset_url(image_base_url: &str, key: &str) -> Result<Url> {
    if key.is_empty() || key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidReference(key.to_string()));
    }

    let path = if key.starts_with('/') {
        key.to_string()
    } else {
        format!("/{}", urlencoding::encode(key))
    };
    let raw = format!("{}{}", image_base_url.trim_end_matches('/'), path);

    Url::parse(&raw).map_err(|_| Error::InvalidReference(key.to_string()))
}
