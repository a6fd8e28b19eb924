//! Response decoding.
//!
//! Decoding is synchronous: payloads are already in memory by the time a decoder
//! sees them. Both seams are traits so alternative upstream formats can be
//! plugged in without touching the fetchers.

use crate::error::{Error, Result};
use crate::types::{Asset, AssetFormat, Record};
use serde::Deserialize;

/// Decodes record-source payloads
pub trait RecordDecoder: Send + Sync {
    /// Decode a listing response into records, preserving upstream order
    fn decode_records(&self, bytes: &[u8]) -> Result<Vec<Record>>;

    /// Decode a single-record response
    fn decode_record(&self, bytes: &[u8]) -> Result<Record>;
}

/// Decodes asset payloads
pub trait AssetDecoder: Send + Sync {
    /// Decode raw bytes into an asset
    fn decode_asset(&self, bytes: &[u8]) -> Result<Asset>;
}

/// Listing envelope: `{"page": 1, "results": [...], ...}`
#[derive(Deserialize)]
struct ListingResponse {
    results: Vec<Record>,
}

/// JSON decoder for the TMDB response shapes
#[derive(Clone, Copy, Debug, Default)]
pub struct TmdbJsonDecoder;

impl RecordDecoder for TmdbJsonDecoder {
    fn decode_records(&self, bytes: &[u8]) -> Result<Vec<Record>> {
        let listing: ListingResponse = serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode listing response");
            Error::Decode(format!("listing response: {}", e))
        })?;
        Ok(listing.results)
    }

    fn decode_record(&self, bytes: &[u8]) -> Result<Record> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(format!("record response: {}", e)))
    }
}

/// Image decoder that validates the container signature
///
/// The payload is kept encoded; only its format is established. Anything that is
/// not a recognizable JPEG, PNG, GIF or WebP image is a decode failure, which is
/// what turns an HTML error page served with status 200 into a missing poster.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    /// Detect the image format from the leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<AssetFormat> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(AssetFormat::Jpeg)
        } else if bytes.starts_with(PNG) {
            Some(AssetFormat::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(AssetFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(AssetFormat::WebP)
        } else {
            None
        }
    }
}

impl AssetDecoder for ImageDecoder {
    fn decode_asset(&self, bytes: &[u8]) -> Result<Asset> {
        if bytes.is_empty() {
            return Err(Error::Decode("empty image payload".to_string()));
        }
        let format = Self::sniff(bytes).ok_or_else(|| {
            Error::Decode(format!(
                "unrecognized image format ({} bytes)",
                bytes.len()
            ))
        })?;
        Ok(Asset {
            format,
            bytes: bytes.to_vec(),
        })
    }
}
