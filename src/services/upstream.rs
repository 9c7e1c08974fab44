//! Client for the Starfish metadata service and the optional file server.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::models::entry::Entry;

use super::collections::COLLECTIONS_TAGSET;

/// Fields requested for every entry.
pub const QUERY_FORMAT: &str =
    "parent_path fn type size ct mt at uid gid mode volume ino tags_explicit tags_inherited";

/// Upstream filter selecting regular files only.
pub const FILES_ONLY_FILTER: &str = "type=f";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Starfish API is unavailable: {0}")]
    Unavailable(String),

    #[error("Starfish API authentication failed")]
    AuthenticationFailed,

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Starfish API rate limit exceeded")]
    RateLimited,

    #[error("Starfish API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode Starfish API response: {0}")]
    Decode(String),

    #[error("object not found on file server: {0}")]
    ObjectNotFound(String),

    #[error("no file server configured")]
    FileServerNotConfigured,
}

/// Object content streamed from the file server.
pub struct ObjectContent {
    pub content_length: Option<u64>,
    pub body: Body,
}

impl std::fmt::Debug for ObjectContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectContent")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Entries tagged with `collection_tag`, ordered by parent path then
    /// filename.
    async fn query(
        &self,
        collection_tag: &str,
        filters: &str,
    ) -> Result<Vec<Entry>, UpstreamError>;

    /// Tag names of the collections tag set.
    async fn discover_collections(&self) -> Result<Vec<String>, UpstreamError>;

    /// Raw content of `path` on `volume`.
    async fn fetch_object(&self, volume: &str, path: &str)
        -> Result<ObjectContent, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct TagsetResponse {
    #[serde(default)]
    tag_names: Vec<TagName>,
}

#[derive(Debug, Deserialize)]
struct TagName {
    name: String,
}

#[derive(Debug, Clone)]
pub struct StarfishClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    query_limit: usize,
    file_server: Option<String>,
}

impl StarfishClient {
    pub fn new(
        endpoint: &str,
        token: &str,
        timeout: Duration,
        query_limit: usize,
        file_server: Option<String>,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
            query_limit,
            file_server: file_server.map(|s| s.trim_end_matches('/').to_string()),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        Self::new(
            &config.starfish_endpoint,
            &config.starfish_token,
            Duration::from_secs(config.upstream_timeout_secs),
            config.query_limit,
            config.file_server.clone(),
        )
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;
        Ok(response)
    }
}

async fn check_status(
    response: reqwest::Response,
    subject: &str,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), subject, body = %body, "Starfish API error");
    Err(match status {
        StatusCode::UNAUTHORIZED => UpstreamError::AuthenticationFailed,
        StatusCode::NOT_FOUND => UpstreamError::CollectionNotFound(subject.to_string()),
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited,
        other => UpstreamError::Api {
            status: other.as_u16(),
            body,
        },
    })
}

#[async_trait]
impl Upstream for StarfishClient {
    async fn query(
        &self,
        collection_tag: &str,
        filters: &str,
    ) -> Result<Vec<Entry>, UpstreamError> {
        let url = format!("{}/query/", self.endpoint);
        let mut expression = format!("tag={collection_tag}");
        if !filters.is_empty() {
            expression.push(' ');
            expression.push_str(filters);
        }
        let params = [
            ("query", expression),
            ("format", QUERY_FORMAT.to_string()),
            ("limit", self.query_limit.to_string()),
            ("sort_by", "parent_path,fn".to_string()),
        ];

        tracing::debug!(url = %url, collection = %collection_tag, filters, "Querying Starfish");
        let response = check_status(self.get(&url, &params).await?, collection_tag).await?;
        let entries: Vec<Entry> = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        tracing::debug!(
            collection = %collection_tag,
            count = entries.len(),
            "Starfish query returned"
        );
        Ok(entries)
    }

    async fn discover_collections(&self) -> Result<Vec<String>, UpstreamError> {
        let url = format!("{}/tagset/{COLLECTIONS_TAGSET}/", self.endpoint);
        let params = [
            ("limit", "1000".to_string()),
            ("with_private", "true".to_string()),
        ];
        let response = check_status(self.get(&url, &params).await?, COLLECTIONS_TAGSET).await?;
        let tagset: TagsetResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(tagset.tag_names.into_iter().map(|t| t.name).collect())
    }

    async fn fetch_object(
        &self,
        volume: &str,
        path: &str,
    ) -> Result<ObjectContent, UpstreamError> {
        let base = self
            .file_server
            .as_deref()
            .ok_or(UpstreamError::FileServerNotConfigured)?;
        let url = format!("{base}/{volume}/{}", path.trim_start_matches('/'));
        let response = self
            .http
            .get(&url)
            .header("X-Internal-Token", &self.token)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(UpstreamError::ObjectNotFound(format!("{volume}/{path}")));
        }
        let response = check_status(response, path).await?;
        Ok(ObjectContent {
            content_length: response.content_length(),
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}
