use std::sync::Once;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use tracing_subscriber::EnvFilter;

use crate::services::object_service::{
    METRIC_OBJECTS_RETURNED, METRIC_QUERY_DURATION, METRIC_QUERY_ERRORS, METRIC_QUERY_SUCCESS,
};
use crate::services::query_cache::{
    METRIC_CACHE_CLEAR, METRIC_CACHE_ENTRIES, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATE,
    METRIC_CACHE_MISS, METRIC_CACHE_SET,
};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the JSON tracing subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) {
    describe_metrics();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .json()
        .init();
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(METRIC_CACHE_HIT, Unit::Count, "Query cache hits.");
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Query cache misses, labelled by reason (not_present or expired)."
        );
        describe_counter!(METRIC_CACHE_SET, Unit::Count, "Query results stored in the cache.");
        describe_counter!(
            METRIC_CACHE_INVALIDATE,
            Unit::Count,
            "Query results removed by explicit invalidation."
        );
        describe_counter!(METRIC_CACHE_CLEAR, Unit::Count, "Query results removed by clear.");
        describe_gauge!(METRIC_CACHE_ENTRIES, Unit::Count, "Query results currently cached.");
        describe_histogram!(
            METRIC_QUERY_DURATION,
            Unit::Milliseconds,
            "Starfish query latency in milliseconds."
        );
        describe_counter!(METRIC_QUERY_ERRORS, Unit::Count, "Failed Starfish queries.");
        describe_counter!(METRIC_QUERY_SUCCESS, Unit::Count, "Successful Starfish queries.");
        describe_counter!(
            METRIC_OBJECTS_RETURNED,
            Unit::Count,
            "Objects returned to clients."
        );
    });
}
