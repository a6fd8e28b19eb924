//! Enrichment fan-out strategies.
//!
//! All three take the listing in upstream order and return one
//! [`EnrichedRecord`] per input record, in upstream order. They differ only in
//! how many asset fetches are outstanding at once:
//! - [`task_list`] - every record spawned up front, handles awaited in order
//! - [`task_group`] - every record spawned into a `JoinSet`, joined in completion order
//! - [`staged`] - in-order walk with the next fetch started before the current is awaited
//!
//! Asset failures are absorbed inside each unit of work, so no unit can cancel
//! its siblings.

use std::collections::HashMap;

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::fetcher::AssetFetcher;
use crate::types::{EnrichedRecord, Record};

/// Resolve one record's asset, degrading to no asset on any failure
pub(super) async fn enrich_one(fetcher: &AssetFetcher, record: Record) -> EnrichedRecord {
    let Some(key) = record.asset_ref() else {
        return EnrichedRecord::without_asset(record);
    };

    match fetcher.fetch(key).await {
        Ok(asset) => EnrichedRecord::new(record, Some(asset)),
        Err(e) => {
            tracing::warn!(
                record_id = record.id.get(),
                key,
                error = %e,
                "Asset fetch failed, keeping record without asset"
            );
            EnrichedRecord::without_asset(record)
        }
    }
}

/// [`enrich_one`] that gives up when the run is cancelled
async fn enrich_cancellable(
    fetcher: &AssetFetcher,
    record: Record,
    cancel: &CancellationToken,
) -> Option<EnrichedRecord> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        enriched = enrich_one(fetcher, record) => Some(enriched),
    }
}

fn spawn_enrichment(
    fetcher: &AssetFetcher,
    record: Record,
    cancel: &CancellationToken,
) -> JoinHandle<Option<EnrichedRecord>> {
    let fetcher = fetcher.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move { enrich_cancellable(&fetcher, record, &cancel).await })
}

/// Turn a joined task into a result, falling back to the bare record
fn settle(
    record: Record,
    joined: std::result::Result<Option<EnrichedRecord>, JoinError>,
) -> EnrichedRecord {
    match joined {
        Ok(Some(enriched)) => enriched,
        // Cancelled: the run's result is discarded anyway
        Ok(None) => EnrichedRecord::without_asset(record),
        Err(e) => {
            tracing::warn!(
                record_id = record.id.get(),
                error = %e,
                "Enrichment task did not complete, keeping record without asset"
            );
            EnrichedRecord::without_asset(record)
        }
    }
}

/// Spawn every enrichment immediately, then await the handles in listing order
pub(super) async fn task_list(
    fetcher: &AssetFetcher,
    records: Vec<Record>,
    cancel: &CancellationToken,
) -> Vec<EnrichedRecord> {
    let tasks: Vec<_> = records
        .into_iter()
        .map(|record| {
            let handle = spawn_enrichment(fetcher, record.clone(), cancel);
            (record, handle)
        })
        .collect();

    let mut enriched = Vec::with_capacity(tasks.len());
    for (record, handle) in tasks {
        enriched.push(settle(record, handle.await));
    }
    enriched
}

/// Spawn every enrichment into one group and join them as they complete
///
/// Dropping the group (for example when the run is aborted) aborts every task
/// still in it.
pub(super) async fn task_group(
    fetcher: &AssetFetcher,
    records: Vec<Record>,
    cancel: &CancellationToken,
) -> Vec<EnrichedRecord> {
    let mut group = JoinSet::new();
    let mut task_index = HashMap::with_capacity(records.len());

    for (index, record) in records.iter().cloned().enumerate() {
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        let handle = group.spawn(async move {
            (index, enrich_cancellable(&fetcher, record, &cancel).await)
        });
        task_index.insert(handle.id(), index);
    }

    let mut completed: Vec<Option<EnrichedRecord>> = vec![None; records.len()];
    let mut completion_order = Vec::with_capacity(records.len());

    while let Some(joined) = group.join_next_with_id().await {
        let (index, outcome) = match joined {
            Ok((_, (index, outcome))) => (index, Ok(outcome)),
            Err(e) => match task_index.get(&e.id()) {
                Some(&index) => (index, Err(e)),
                None => {
                    tracing::warn!(error = %e, "Enrichment task with unknown id failed");
                    continue;
                }
            },
        };
        completion_order.push(index);
        completed[index] = Some(settle(records[index].clone(), outcome));
    }

    tracing::trace!(?completion_order, "Task group joined");

    // Back to listing order so the score sort keeps upstream order for ties
    completed
        .into_iter()
        .zip(records)
        .map(|(slot, record)| slot.unwrap_or_else(|| EnrichedRecord::without_asset(record)))
        .collect()
}

/// Walk the listing in order, keeping at most two fetches outstanding
///
/// Each record's fetch is started before the previous record's result is
/// awaited, so consecutive fetches overlap pairwise.
pub(super) async fn staged(
    fetcher: &AssetFetcher,
    records: Vec<Record>,
    cancel: &CancellationToken,
) -> Vec<EnrichedRecord> {
    let mut enriched = Vec::with_capacity(records.len());
    let mut outstanding: Option<(Record, JoinHandle<Option<EnrichedRecord>>)> = None;

    for record in records {
        let handle = spawn_enrichment(fetcher, record.clone(), cancel);
        if let Some((previous, previous_handle)) = outstanding.replace((record, handle)) {
            enriched.push(settle(previous, previous_handle.await));
        }
    }
    if let Some((last, handle)) = outstanding {
        enriched.push(settle(last, handle.await));
    }

    enriched
}

/// Stable sort by score, best first; equal scores keep their relative order
pub(super) fn sort_by_score(records: &mut [EnrichedRecord]) {
    records.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));
}

// `total_cmp` orders -0.0 below 0.0; adding 0.0 folds both into 0.0
fn sort_key(record: &EnrichedRecord) -> f64 {
    record.score() + 0.0
}
