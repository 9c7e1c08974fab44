//! S3 XML response documents.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::listing::{ListingResult, ObjectSummary};

pub const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";
pub const XML_CONTENT_TYPE: &str = "application/xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const OWNER_ID: &str = "starfish";
const STORAGE_CLASS: &str = "STANDARD";

/// Serialize `doc` as a standalone XML document.
pub fn render<T: Serialize>(doc: &T) -> Result<String, AppError> {
    let body = quick_xml::se::to_string(doc)
        .map_err(|e| AppError::Internal(format!("XML serialization failed: {e}")))?;
    Ok(format!("{XML_DECLARATION}\n{body}"))
}

/// ISO-8601 with millisecond precision, as S3 clients expect.
pub fn timestamp(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| "1970-01-01T00:00:00.000Z".to_string())
}

#[derive(Debug, Serialize)]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "DisplayName")]
    pub display_name: String,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            id: OWNER_ID.into(),
            display_name: OWNER_ID.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BucketXml {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CreationDate")]
    pub creation_date: String,
}

#[derive(Debug, Serialize)]
pub struct Buckets {
    #[serde(rename = "Bucket")]
    pub bucket: Vec<BucketXml>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ListAllMyBucketsResult")]
pub struct ListAllMyBucketsResult {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    #[serde(rename = "Owner")]
    pub owner: Owner,
    #[serde(rename = "Buckets")]
    pub buckets: Buckets,
}

impl ListAllMyBucketsResult {
    pub fn new<I>(names: I, created: Option<DateTime<Utc>>) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let creation_date = timestamp(created);
        Self {
            xmlns: S3_XMLNS,
            owner: Owner::default(),
            buckets: Buckets {
                bucket: names
                    .into_iter()
                    .map(|name| BucketXml {
                        name,
                        creation_date: creation_date.clone(),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Contents {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "LastModified")]
    pub last_modified: String,
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "StorageClass")]
    pub storage_class: &'static str,
}

impl From<ObjectSummary> for Contents {
    fn from(object: ObjectSummary) -> Self {
        Self {
            key: object.key,
            last_modified: timestamp(object.last_modified),
            etag: object.etag,
            size: object.size,
            storage_class: STORAGE_CLASS,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommonPrefix {
    #[serde(rename = "Prefix")]
    pub prefix: String,
}

fn split_listing(listing: ListingResult) -> (Vec<Contents>, Vec<CommonPrefix>) {
    let contents = listing.objects.into_iter().map(Contents::from).collect();
    let prefixes = listing
        .common_prefixes
        .into_iter()
        .map(|prefix| CommonPrefix { prefix })
        .collect();
    (contents, prefixes)
}

/// Version 1 listing (`GET /{bucket}`).
#[derive(Debug, Serialize)]
#[serde(rename = "ListBucketResult")]
pub struct ListBucketResultV1 {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Prefix")]
    pub prefix: String,
    #[serde(rename = "Marker")]
    pub marker: String,
    #[serde(rename = "Delimiter", skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(rename = "MaxKeys")]
    pub max_keys: usize,
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    #[serde(rename = "NextMarker", skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    #[serde(rename = "Contents")]
    pub contents: Vec<Contents>,
    #[serde(rename = "CommonPrefixes")]
    pub common_prefixes: Vec<CommonPrefix>,
}

/// Request parameters echoed back in a listing document.
#[derive(Debug, Clone, Copy)]
pub struct ListingEcho<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub delimiter: &'a str,
    pub max_keys: usize,
}

impl ListBucketResultV1 {
    pub fn new(echo: ListingEcho<'_>, marker: &str, listing: ListingResult) -> Self {
        let next_marker = if listing.is_truncated {
            listing.last_returned().map(str::to_string)
        } else {
            None
        };
        let is_truncated = listing.is_truncated;
        let (contents, common_prefixes) = split_listing(listing);
        Self {
            xmlns: S3_XMLNS,
            name: echo.bucket.to_string(),
            prefix: echo.prefix.to_string(),
            marker: marker.to_string(),
            delimiter: non_empty(echo.delimiter),
            max_keys: echo.max_keys,
            is_truncated,
            next_marker,
            contents,
            common_prefixes,
        }
    }
}

/// Version 2 listing (`GET /{bucket}?list-type=2`).
#[derive(Debug, Serialize)]
#[serde(rename = "ListBucketResult")]
pub struct ListBucketResultV2 {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Prefix")]
    pub prefix: String,
    #[serde(rename = "Delimiter", skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(rename = "MaxKeys")]
    pub max_keys: usize,
    #[serde(rename = "KeyCount")]
    pub key_count: usize,
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    #[serde(rename = "ContinuationToken", skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    #[serde(rename = "NextContinuationToken", skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
    #[serde(rename = "StartAfter", skip_serializing_if = "Option::is_none")]
    pub start_after: Option<String>,
    #[serde(rename = "Contents")]
    pub contents: Vec<Contents>,
    #[serde(rename = "CommonPrefixes")]
    pub common_prefixes: Vec<CommonPrefix>,
}

impl ListBucketResultV2 {
    pub fn new(
        echo: ListingEcho<'_>,
        continuation_token: Option<String>,
        start_after: Option<String>,
        next_continuation_token: Option<String>,
        listing: ListingResult,
    ) -> Self {
        let is_truncated = listing.is_truncated;
        let key_count = listing.objects.len();
        let (contents, common_prefixes) = split_listing(listing);
        Self {
            xmlns: S3_XMLNS,
            name: echo.bucket.to_string(),
            prefix: echo.prefix.to_string(),
            delimiter: non_empty(echo.delimiter),
            max_keys: echo.max_keys,
            key_count,
            is_truncated,
            continuation_token,
            next_continuation_token,
            start_after,
            contents,
            common_prefixes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename = "Error")]
pub struct ErrorDocument {
    #[serde(rename = "Code")]
    pub code: &'static str,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Resource")]
    pub resource: String,
    #[serde(rename = "RequestId")]
    pub request_id: String,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
