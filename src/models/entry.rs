use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::rewrite::format::join_path;

/// Type code Starfish reports for regular files (`S_IFREG`).
pub const FILE_TYPE: u32 = 32768;

/// One metadata record as returned by the Starfish query API.
///
/// Every field is optional on the wire; missing values deserialize to their
/// zero value so partial metadata never fails a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "fn")]
    pub filename: String,
    pub parent_path: String,
    pub full_path: String,
    #[serde(rename = "type")]
    pub entry_type: u32,
    pub size: u64,
    pub mode: String,
    pub uid: u32,
    pub gid: u32,
    #[serde(rename = "ct")]
    pub create_time_unix: i64,
    #[serde(rename = "mt")]
    pub modify_time_unix: i64,
    #[serde(rename = "at")]
    pub access_time_unix: i64,
    pub volume: String,
    #[serde(rename = "ino")]
    pub inode: u64,
    #[serde(rename = "tags_explicit")]
    pub tags_explicit_str: String,
    #[serde(rename = "tags_inherited")]
    pub tags_inherited_str: String,
}

impl Entry {
    pub fn is_file(&self) -> bool {
        self.entry_type == FILE_TYPE
    }

    pub fn create_time(&self) -> Option<DateTime<Utc>> {
        unix_to_datetime(self.create_time_unix)
    }

    pub fn modify_time(&self) -> Option<DateTime<Utc>> {
        unix_to_datetime(self.modify_time_unix)
    }

    pub fn access_time(&self) -> Option<DateTime<Utc>> {
        unix_to_datetime(self.access_time_unix)
    }

    pub fn tags_explicit(&self) -> Vec<String> {
        split_tags(&self.tags_explicit_str)
    }

    pub fn tags_inherited(&self) -> Vec<String> {
        split_tags(&self.tags_inherited_str)
    }

    /// Explicit tags followed by inherited ones, first occurrence wins.
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags = self.tags_explicit();
        for tag in self.tags_inherited() {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    /// The key an entry would have without any rewrite rule applied.
    ///
    /// Uses the full path when Starfish supplied one, otherwise parent path
    /// joined with the filename. Leading separators are stripped.
    pub fn natural_key(&self) -> String {
        if !self.full_path.is_empty() {
            return self.full_path.trim_start_matches('/').to_string();
        }
        if self.parent_path.is_empty() {
            return self.filename.clone();
        }
        join_path(&[self.parent_path.as_str(), self.filename.as_str()])
            .trim_start_matches('/')
            .to_string()
    }

    /// Cheap change identifier built from size and modification time.
    pub fn etag(&self) -> String {
        format!("\"{}-{}\"", self.size, self.modify_time_unix)
    }
}

fn unix_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

fn split_tags(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}
