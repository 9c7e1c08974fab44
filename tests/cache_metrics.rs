use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use starfish_gateway::config::AppConfig;
use starfish_gateway::models::entry::Entry;
use starfish_gateway::models::listing::ListingParams;
use starfish_gateway::models::rule::RewriteConfig;
use starfish_gateway::services::object_service;
use starfish_gateway::services::query_cache::QueryCache;
use starfish_gateway::services::upstream::{ObjectContent, Upstream, UpstreamError};
use starfish_gateway::state::AppState;

struct OneEntryUpstream;

#[async_trait]
impl Upstream for OneEntryUpstream {
    async fn query(&self, collection_tag: &str, _filters: &str) -> Result<Vec<Entry>, UpstreamError> {
        if collection_tag == "Collections:Broken" {
            return Err(UpstreamError::RateLimited);
        }
        Ok(vec![Entry {
            filename: "a.txt".to_string(),
            parent_path: "/data".to_string(),
            ..Default::default()
        }])
    }

    async fn discover_collections(&self) -> Result<Vec<String>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn fetch_object(&self, _volume: &str, _path: &str) -> Result<ObjectContent, UpstreamError> {
        Err(UpstreamError::FileServerNotConfigured)
    }
}

fn miss_count(snapshotter: &Snapshotter, reason: &str) -> Option<u64> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(composite_key, _, _, value)| {
            let key = composite_key.key();
            let matches = key.name() == "starfish_cache_miss_total"
                && key
                    .labels()
                    .any(|label| label.key() == "reason" && label.value() == reason);
            match (matches, value) {
                (true, DebugValue::Counter(count)) => Some(count),
                _ => None,
            }
        })
}

#[tokio::test(start_paused = true)]
async fn cache_and_query_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Direct cache use: miss, set, hit, expiry, invalidate, clear
    let cache = QueryCache::new(Duration::from_secs(1));
    assert!(cache.get("k").is_none());
    cache.set("k", vec![Entry::default()], "vol:/");
    assert!(cache.get("k").is_some());
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get("k").is_none());
    cache.set("k", vec![Entry::default()], "vol:/");
    cache.invalidate("k");
    cache.set("k", vec![Entry::default()], "vol:/");
    assert_eq!(cache.clear(), 1);

    assert_eq!(miss_count(&snapshotter, "not_present"), Some(1));
    assert_eq!(miss_count(&snapshotter, "expired"), Some(1));

    // Orchestrated queries: one success, one failure
    let config = AppConfig::for_endpoint("http://starfish.invalid", "token");
    let state = AppState::new(config, &RewriteConfig::default(), Arc::new(OneEntryUpstream));
    state.collections.insert("projects", "Collections:Projects");
    state.collections.insert("broken", "Collections:Broken");

    let listing = object_service::list_objects(&state, "projects", &ListingParams::default())
        .await
        .unwrap();
    assert_eq!(listing.objects.len(), 1);
    assert!(object_service::list_objects(&state, "broken", &ListingParams::default())
        .await
        .is_err());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "starfish_cache_hit_total",
        "starfish_cache_miss_total",
        "starfish_cache_set_total",
        "starfish_cache_invalidate_total",
        "starfish_cache_clear_total",
        "starfish_cache_entries",
        "starfish_query_duration_ms",
        "starfish_query_success_total",
        "starfish_query_errors_total",
        "starfish_objects_returned_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
