use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_KEYS: usize = 1000;

/// Per-request listing parameters. Empty strings mean "not set".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingParams {
    pub prefix: String,
    pub delimiter: String,
    pub start_after: String,
    /// Zero disables truncation.
    pub max_keys: usize,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            delimiter: String::new(),
            start_after: String::new(),
            max_keys: DEFAULT_MAX_KEYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingResult {
    pub objects: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
}

impl ListingResult {
    /// Last object key, or the last common prefix when no objects were
    /// returned.
    pub fn last_returned(&self) -> Option<&str> {
        self.objects
            .last()
            .map(|o| o.key.as_str())
            .or_else(|| self.common_prefixes.last().map(String::as_str))
    }
}

/// Query string of `GET /{bucket}` for both listing API versions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListObjectsQuery {
    pub list_type: Option<String>,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub marker: Option<String>,
    pub start_after: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: Option<String>,
}

impl ListObjectsQuery {
    pub fn is_v2(&self) -> bool {
        self.list_type.as_deref() == Some("2")
    }
}
