use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::models::rule::RewriteConfig;
use crate::rewrite::RewriteEngine;
use crate::services::collections::CollectionRegistry;
use crate::services::listing_service::{ListingConverter, PrefixMode};
use crate::services::query_cache::QueryCache;
use crate::services::upstream::Upstream;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<QueryCache>,
    pub collections: Arc<CollectionRegistry>,
    pub converter: Arc<ListingConverter>,
    pub upstream: Arc<dyn Upstream>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, rules: &RewriteConfig, upstream: Arc<dyn Upstream>) -> Self {
        let engine = Arc::new(RewriteEngine::new(rules));
        let prefix_mode = PrefixMode::from_strict_flag(config.strict_prefix_filter);
        Self {
            cache: Arc::new(QueryCache::new(Duration::from_secs(config.cache_ttl_secs))),
            collections: Arc::new(CollectionRegistry::new()),
            converter: Arc::new(ListingConverter::new(engine, prefix_mode)),
            upstream,
            config: Arc::new(config),
            start_time: chrono::Utc::now(),
        }
    }
}
