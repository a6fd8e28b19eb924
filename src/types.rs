//! Core types for now-playing

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Error;

/// Upstream identifier of a record, unique within one listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl PartialEq<i64> for RecordId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A movie as delivered by the listing endpoint
///
/// Field names follow the upstream JSON so the type deserializes directly.
/// Records are never mutated after decoding; enrichment wraps them in an
/// [`EnrichedRecord`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Upstream identifier
    pub id: RecordId,
    /// Display title
    pub title: String,
    /// Synopsis
    #[serde(default)]
    pub overview: String,
    /// Poster reference, resolved against the image base URL (absent for some movies)
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Average rating, used for the final ordering
    pub vote_average: f64,
    /// Release date as sent upstream (usually `YYYY-MM-DD`, sometimes empty)
    #[serde(default)]
    pub release_date: String,
}

impl Record {
    /// The asset reference, treating an empty string like an absent one
    pub fn asset_ref(&self) -> Option<&str> {
        self.poster_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Parse [`release_date`](Self::release_date) as an ISO date
    pub fn release_date_parsed(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::parse_from_str(&self.release_date, "%Y-%m-%d").ok()
    }
}

/// Image container detected from the payload's leading bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    /// JPEG (`FF D8 FF`)
    Jpeg,
    /// PNG (`89 50 4E 47 0D 0A 1A 0A`)
    Png,
    /// GIF87a / GIF89a
    Gif,
    /// RIFF container with a WEBP tag
    WebP,
}

impl AssetFormat {
    /// MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AssetFormat::Jpeg => "image/jpeg",
            AssetFormat::Png => "image/png",
            AssetFormat::Gif => "image/gif",
            AssetFormat::WebP => "image/webp",
        }
    }
}

/// A decoded poster image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    /// Detected container format
    pub format: AssetFormat,
    /// Raw encoded image bytes
    pub bytes: Vec<u8>,
}

impl Asset {
    /// Size of the encoded image in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty (never true for decoder output)
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A record together with its resolved poster, if any
#[derive(Clone, Debug, PartialEq)]
pub struct EnrichedRecord {
    /// The record as decoded upstream
    pub record: Record,
    /// Poster image; `None` when the record has no reference or the fetch failed
    pub asset: Option<Arc<Asset>>,
}

impl EnrichedRecord {
    /// Enriched copy carrying the given asset
    pub fn new(record: Record, asset: Option<Arc<Asset>>) -> Self {
        Self { record, asset }
    }

    /// Enriched copy with no asset
    pub fn without_asset(record: Record) -> Self {
        Self {
            record,
            asset: None,
        }
    }

    /// Record identifier
    pub fn id(&self) -> RecordId {
        self.record.id
    }

    /// Sort key (the record's average rating)
    pub fn score(&self) -> f64 {
        self.record.vote_average
    }

    /// Whether the poster was resolved
    pub fn has_asset(&self) -> bool {
        self.asset.is_some()
    }
}

/// Concurrency pattern used to enrich a listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Spawn every enrichment up front, await the handles in listing order
    TaskList,
    /// Spawn every enrichment into one task group, collect in completion order
    TaskGroup,
    /// Walk the listing in order with at most two fetches outstanding
    Staged,
}

impl Strategy {
    /// All strategies, in declaration order
    pub const ALL: [Strategy; 3] = [Strategy::TaskList, Strategy::TaskGroup, Strategy::Staged];

    /// Stable lowercase name, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::TaskList => "task_list",
            Strategy::TaskGroup => "task_group",
            Strategy::Staged => "staged",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_list" | "task-list" | "tasklist" => Ok(Strategy::TaskList),
            "task_group" | "task-group" | "taskgroup" => Ok(Strategy::TaskGroup),
            "staged" => Ok(Strategy::Staged),
            other => Err(Error::Other(format!("unknown strategy: {}", other))),
        }
    }
}

/// Observable state of the orchestrator
#[derive(Clone, Debug, Default)]
pub enum FetchState {
    /// No run has started yet
    #[default]
    Idle,
    /// A run is fetching or enriching
    Loading,
    /// The latest run finished; records sorted by score, best first
    Success(Arc<Vec<EnrichedRecord>>),
    /// The latest run could not fetch the listing
    Failure(Error),
}

impl FetchState {
    /// Whether this is `Success` or `Failure`
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Success(_) | FetchState::Failure(_))
    }

    /// Records of a `Success` state
    pub fn records(&self) -> Option<&[EnrichedRecord]> {
        match self {
            FetchState::Success(records) => Some(records.as_slice()),
            _ => None,
        }
    }

    /// Error of a `Failure` state
    pub fn error(&self) -> Option<&Error> {
        match self {
            FetchState::Failure(e) => Some(e),
            _ => None,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            FetchState::Idle => "idle",
            FetchState::Loading => "loading",
            FetchState::Success(_) => "success",
            FetchState::Failure(_) => "failure",
        }
    }
}

/// Generation number of an orchestrator run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A state transition published to subscribers
#[derive(Clone, Debug)]
pub struct StateChange {
    /// Run that caused the transition
    pub run: RunId,
    /// The new state
    pub state: FetchState,
}
