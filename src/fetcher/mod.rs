//! Remote fetchers.
//!
//! - [`record`] - Primary listing fetch (stateless, one round trip)
//! - [`asset`] - Cached poster fetch with optional request coalescing

mod asset;
mod record;

pub use asset::{AssetFetcher, FetchStats};
pub use record::RecordFetcher;
