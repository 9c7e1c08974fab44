//! Time-bounded cache of upstream query results.
//!
//! Expiry is lazy: an expired result is removed by the lookup that finds it.
//! There is no background sweep. Cache operations never fail.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::time::Instant;

use crate::models::entry::Entry;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

pub const METRIC_CACHE_HIT: &str = "starfish_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "starfish_cache_miss_total";
pub const METRIC_CACHE_SET: &str = "starfish_cache_set_total";
pub const METRIC_CACHE_INVALIDATE: &str = "starfish_cache_invalidate_total";
pub const METRIC_CACHE_CLEAR: &str = "starfish_cache_clear_total";
pub const METRIC_CACHE_ENTRIES: &str = "starfish_cache_entries";

/// Why a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    NotPresent,
    Expired,
}

impl MissReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MissReason::NotPresent => "not_present",
            MissReason::Expired => "expired",
        }
    }
}

/// One cached upstream result. The entry set is shared, never copied, by
/// readers.
#[derive(Debug)]
pub struct CachedResult {
    pub entries: Arc<Vec<Entry>>,
    pub cached_at: Instant,
    pub expires_at: Instant,
    /// Volume/path descriptor of the query that produced the entries.
    pub volume_and_path: String,
    hits: AtomicU64,
}

impl CachedResult {
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// What a successful `get` hands back.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entries: Arc<Vec<Entry>>,
    pub volume_and_path: String,
    pub cached_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub total_hits: u64,
    /// Cumulative hits divided by the number of stored results.
    pub hit_ratio: f64,
}

#[derive(Debug)]
pub struct QueryCache {
    data: DashMap<String, CachedResult>,
    ttl: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for an upstream query: `"{bucket}:{filters}"`.
    pub fn key(bucket: &str, filters: &str) -> String {
        format!("{bucket}:{filters}")
    }

    pub fn get(&self, key: &str) -> Option<CacheHit> {
        let now = Instant::now();

        if let Some(cached) = self.data.get(key) {
            if cached.is_valid_at(now) {
                cached.hits.fetch_add(1, Ordering::Relaxed);
                counter!(METRIC_CACHE_HIT).increment(1);
                tracing::debug!(
                    cache_key = %key,
                    age_ms = now.duration_since(cached.cached_at).as_millis() as u64,
                    "Cache hit"
                );
                return Some(CacheHit {
                    entries: Arc::clone(&cached.entries),
                    volume_and_path: cached.volume_and_path.clone(),
                    cached_at: cached.cached_at,
                });
            }
        } else {
            self.record_miss(key, MissReason::NotPresent);
            return None;
        }

        // Re-check under the write lock; a concurrent set may have refreshed it.
        let removed = self
            .data
            .remove_if(key, |_, cached| !cached.is_valid_at(now))
            .is_some();
        if removed {
            gauge!(METRIC_CACHE_ENTRIES).set(self.data.len() as f64);
        }
        self.record_miss(key, MissReason::Expired);
        None
    }

    pub fn set(
        &self,
        key: impl Into<String>,
        entries: impl Into<Arc<Vec<Entry>>>,
        volume_and_path: impl Into<String>,
    ) {
        let key = key.into();
        let entries = entries.into();
        let now = Instant::now();
        let count = entries.len();
        let cached = CachedResult {
            entries,
            cached_at: now,
            expires_at: now + self.ttl,
            volume_and_path: volume_and_path.into(),
            hits: AtomicU64::new(0),
        };
        self.data.insert(key.clone(), cached);

        counter!(METRIC_CACHE_SET).increment(1);
        gauge!(METRIC_CACHE_ENTRIES).set(self.data.len() as f64);
        tracing::debug!(
            cache_key = %key,
            entries = count,
            ttl_secs = self.ttl.as_secs(),
            "Cached query result"
        );
    }

    pub fn invalidate(&self, key: &str) {
        if self.data.remove(key).is_some() {
            counter!(METRIC_CACHE_INVALIDATE).increment(1);
            gauge!(METRIC_CACHE_ENTRIES).set(self.data.len() as f64);
            tracing::debug!(cache_key = %key, "Cache entry invalidated");
        }
    }

    /// Drop every result and return how many were removed.
    pub fn clear(&self) -> usize {
        let count = self.data.len();
        self.data.clear();
        counter!(METRIC_CACHE_CLEAR).increment(count as u64);
        gauge!(METRIC_CACHE_ENTRIES).set(0.0);
        count
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut stats = CacheStats {
            total: 0,
            valid: 0,
            expired: 0,
            total_hits: 0,
            hit_ratio: 0.0,
        };
        for item in self.data.iter() {
            let cached = item.value();
            stats.total += 1;
            stats.total_hits += cached.hit_count();
            if cached.is_valid_at(now) {
                stats.valid += 1;
            } else {
                stats.expired += 1;
            }
        }
        if stats.total > 0 {
            stats.hit_ratio = stats.total_hits as f64 / stats.total as f64;
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn record_miss(&self, key: &str, reason: MissReason) {
        counter!(METRIC_CACHE_MISS, "reason" => reason.as_str()).increment(1);
        tracing::debug!(cache_key = %key, reason = reason.as_str(), "Cache miss");
    }
}
