use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Tag set whose members are exposed as buckets.
pub const COLLECTIONS_TAGSET: &str = "Collections";

/// Bucket name and upstream tag for a discovered collection tag name.
pub fn bucket_mapping(tag_name: &str) -> (String, String) {
    (
        tag_name.to_lowercase(),
        format!("{COLLECTIONS_TAGSET}:{tag_name}"),
    )
}

#[derive(Debug, Default)]
struct Registry {
    buckets: HashMap<String, String>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Maps bucket names to upstream collection tags.
///
/// Readers never observe a half-applied refresh: `replace_all` swaps the
/// whole map under the write lock.
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    inner: RwLock<Registry>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mappings<I, K, V>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let registry = Self::new();
        registry.replace_all(
            mappings
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        registry
    }

    /// Upstream tag for `bucket`.
    pub fn resolve(&self, bucket: &str) -> Result<String, AppError> {
        self.read("resolve")
            .buckets
            .get(bucket)
            .cloned()
            .ok_or_else(|| AppError::NoSuchBucket(bucket.to_string()))
    }

    pub fn contains(&self, bucket: &str) -> bool {
        self.read("contains").buckets.contains_key(bucket)
    }

    pub fn insert(&self, bucket: impl Into<String>, tag: impl Into<String>) {
        self.write("insert").buckets.insert(bucket.into(), tag.into());
    }

    pub fn replace_all(&self, buckets: HashMap<String, String>) {
        let mut guard = self.write("replace_all");
        guard.buckets = buckets;
        guard.refreshed_at = Some(Utc::now());
    }

    /// Sorted copy of the current mapping.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .read("snapshot")
            .buckets
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.read("len").buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.read("refreshed_at").refreshed_at
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!(op, lock_kind = "rwlock.read", "Recovered from poisoned registry lock");
            poisoned.into_inner()
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!(op, lock_kind = "rwlock.write", "Recovered from poisoned registry lock");
            poisoned.into_inner()
        })
    }
}
