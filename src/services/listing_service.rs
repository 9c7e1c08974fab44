//! Turns a flat upstream entry set into a delimiter-grouped, paginated
//! listing.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::entry::Entry;
use crate::models::listing::{ListingParams, ListingResult, ObjectSummary};
use crate::rewrite::RewriteEngine;

/// How `prefix` constrains keys that do not start with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrefixMode {
    /// Keys outside the prefix are still listed as plain objects; the prefix
    /// only shapes common-prefix folding.
    #[default]
    Permissive,
    /// Keys outside the prefix are dropped.
    Strict,
}

impl PrefixMode {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            PrefixMode::Strict
        } else {
            PrefixMode::Permissive
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingConverter {
    engine: Arc<RewriteEngine>,
    prefix_mode: PrefixMode,
}

impl ListingConverter {
    pub fn new(engine: Arc<RewriteEngine>, prefix_mode: PrefixMode) -> Self {
        Self {
            engine,
            prefix_mode,
        }
    }

    pub fn engine(&self) -> &RewriteEngine {
        &self.engine
    }

    pub fn prefix_mode(&self) -> PrefixMode {
        self.prefix_mode
    }

    /// The key clients see for `entry` in `bucket`.
    pub fn presented_key(&self, entry: &Entry, bucket: &str) -> String {
        self.engine.rewrite(entry, &entry.natural_key(), bucket)
    }

    /// First entry whose presented key is exactly `key`.
    pub fn find<'e>(
        &self,
        entries: &'e [Entry],
        bucket: &str,
        key: &str,
    ) -> Option<&'e Entry> {
        entries
            .iter()
            .find(|entry| self.presented_key(entry, bucket) == key)
    }

    /// Entries are processed in upstream order and never re-sorted.
    /// Truncation is driven by the object count alone; `max_keys == 0`
    /// means unlimited.
    pub fn convert(
        &self,
        entries: &[Entry],
        bucket: &str,
        params: &ListingParams,
    ) -> ListingResult {
        let mut result = ListingResult::default();
        let mut seen_prefixes: HashSet<String> = HashSet::new();

        for entry in entries {
            if params.max_keys > 0 && result.objects.len() >= params.max_keys {
                result.is_truncated = true;
                break;
            }

            let key = self.presented_key(entry, bucket);

            if !params.start_after.is_empty() && key.as_str() <= params.start_after.as_str() {
                continue;
            }

            if self.prefix_mode == PrefixMode::Strict && !key.starts_with(&params.prefix) {
                continue;
            }

            if let Some(common) = common_prefix(&key, &params.prefix, &params.delimiter) {
                if seen_prefixes.insert(common.clone()) {
                    result.common_prefixes.push(common);
                }
                continue;
            }

            result.objects.push(ObjectSummary {
                size: entry.size,
                last_modified: entry.modify_time(),
                etag: entry.etag(),
                key,
            });
        }

        tracing::debug!(
            bucket = %bucket,
            prefix = %params.prefix,
            delimiter = %params.delimiter,
            objects = result.objects.len(),
            common_prefixes = result.common_prefixes.len(),
            truncated = result.is_truncated,
            "Converted listing"
        );
        result
    }
}

/// The common prefix `key` folds into, if any: `prefix` plus the remainder
/// up to and including the first delimiter, provided at least one character
/// follows that delimiter. Keys outside `prefix` never fold.
pub fn common_prefix(key: &str, prefix: &str, delimiter: &str) -> Option<String> {
    if delimiter.is_empty() {
        return None;
    }
    let remainder = key.strip_prefix(prefix)?;
    let idx = remainder.find(delimiter)?;
    let end = idx + delimiter.len();
    if end < remainder.len() {
        Some(format!("{prefix}{}", &remainder[..end]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::common_prefix;

    #[test]
    fn folds_first_level_below_prefix() {
        assert_eq!(common_prefix("a/b/c.txt", "", "/").as_deref(), Some("a/"));
        assert_eq!(common_prefix("a/b/c.txt", "a/", "/").as_deref(), Some("a/b/"));
        assert_eq!(common_prefix("a/d.txt", "a/", "/"), None);
    }

    #[test]
    fn needs_content_after_delimiter() {
        assert_eq!(common_prefix("dir/", "", "/"), None);
        assert_eq!(common_prefix("x--y", "", "--").as_deref(), Some("x--"));
    }

    #[test]
    fn keys_outside_prefix_never_fold() {
        assert_eq!(common_prefix("b/c.txt", "a/", "/"), None);
        assert_eq!(common_prefix("a/b", "", ""), None);
    }
}
