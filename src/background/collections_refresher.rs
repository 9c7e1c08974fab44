use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;

use crate::services::collections::bucket_mapping;
use crate::services::upstream::UpstreamError;
use crate::state::AppState;

/// Discover the collection tags and replace the bucket mapping with them.
/// On failure the previous mapping stays in place.
pub async fn refresh(state: &AppState) -> Result<usize, UpstreamError> {
    let names = state.upstream.discover_collections().await?;
    let buckets: HashMap<String, String> = names.iter().map(|name| bucket_mapping(name)).collect();
    let count = buckets.len();
    state.collections.replace_all(buckets);
    Ok(count)
}

pub async fn run(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let interval = Duration::from_secs(state.config.collections_refresh_interval_secs.max(1));

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                tracing::info!("Collections refresher shutting down");
                return;
            }
        }

        match refresh(&state).await {
            Ok(count) => {
                tracing::debug!(buckets = count, "Collections refreshed");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    buckets = state.collections.len(),
                    "Collections refresh failed; keeping previous mapping"
                );
            }
        }
    }
}
