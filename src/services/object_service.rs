//! Request orchestration: cache lookup, upstream fetch on miss, then
//! conversion into listing or object results.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};

use crate::error::AppError;
use crate::models::entry::Entry;
use crate::models::listing::{ListingParams, ListingResult};
use crate::services::query_cache::QueryCache;
use crate::services::upstream::{ObjectContent, FILES_ONLY_FILTER};
use crate::state::AppState;

pub const METRIC_QUERY_DURATION: &str = "starfish_query_duration_ms";
pub const METRIC_QUERY_ERRORS: &str = "starfish_query_errors_total";
pub const METRIC_QUERY_SUCCESS: &str = "starfish_query_success_total";
pub const METRIC_OBJECTS_RETURNED: &str = "starfish_objects_returned_total";

fn metric_labels(bucket: &str, operation: &'static str) -> [(&'static str, String); 2] {
    [
        ("bucket", bucket.to_string()),
        ("operation", operation.to_string()),
    ]
}

/// Entries for `bucket`, served from cache when fresh.
pub async fn fetch_entries(
    state: &AppState,
    bucket: &str,
    operation: &'static str,
) -> Result<Arc<Vec<Entry>>, AppError> {
    let tag = state.collections.resolve(bucket)?;
    let cache_key = QueryCache::key(bucket, FILES_ONLY_FILTER);

    if let Some(hit) = state.cache.get(&cache_key) {
        return Ok(hit.entries);
    }

    let labels = metric_labels(bucket, operation);
    let started = Instant::now();
    let result = state.upstream.query(&tag, FILES_ONLY_FILTER).await;
    histogram!(METRIC_QUERY_DURATION, &labels).record(started.elapsed().as_secs_f64() * 1000.0);

    let entries = match result {
        Ok(entries) => {
            counter!(METRIC_QUERY_SUCCESS, &labels).increment(1);
            Arc::new(entries)
        }
        Err(e) => {
            counter!(METRIC_QUERY_ERRORS, &labels).increment(1);
            tracing::warn!(
                bucket = %bucket,
                collection = %tag,
                error = %e,
                "Upstream query failed"
            );
            return Err(e.into());
        }
    };

    tracing::info!(
        bucket = %bucket,
        collection = %tag,
        entries = entries.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Fetched entries from Starfish"
    );
    state.cache.set(cache_key, Arc::clone(&entries), tag);
    Ok(entries)
}

pub async fn list_objects(
    state: &AppState,
    bucket: &str,
    params: &ListingParams,
) -> Result<ListingResult, AppError> {
    let entries = fetch_entries(state, bucket, "list_objects").await?;
    let listing = state.converter.convert(&entries, bucket, params);
    counter!(METRIC_OBJECTS_RETURNED, &metric_labels(bucket, "list_objects"))
        .increment(listing.objects.len() as u64);
    Ok(listing)
}

/// The entry presented under `key`.
pub async fn find_object(
    state: &AppState,
    bucket: &str,
    key: &str,
    operation: &'static str,
) -> Result<Entry, AppError> {
    let entries = fetch_entries(state, bucket, operation).await?;
    state
        .converter
        .find(&entries, bucket, key)
        .cloned()
        .ok_or_else(|| AppError::NoSuchKey(key.to_string()))
}

/// Content of `entry`, fetched by the entry's own (un-rewritten) path.
pub async fn object_content(
    state: &AppState,
    bucket: &str,
    entry: &Entry,
) -> Result<ObjectContent, AppError> {
    let path = entry.natural_key();
    let content = state.upstream.fetch_object(&entry.volume, &path).await?;
    counter!(METRIC_OBJECTS_RETURNED, &metric_labels(bucket, "get_object")).increment(1);
    Ok(content)
}
