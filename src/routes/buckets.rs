use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::AppError;
use crate::models::listing::{ListObjectsQuery, ListingParams, DEFAULT_MAX_KEYS};
use crate::services::object_service;
use crate::state::AppState;
use crate::xml::{
    self, ListAllMyBucketsResult, ListBucketResultV1, ListBucketResultV2, ListingEcho,
    XML_CONTENT_TYPE,
};

fn xml_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

fn parse_max_keys(raw: Option<&str>) -> Result<usize, AppError> {
    match raw {
        None | Some("") => Ok(DEFAULT_MAX_KEYS),
        Some(value) => value.trim().parse().map_err(|_| {
            AppError::InvalidArgument(format!(
                "max-keys must be a non-negative integer, got {value:?}"
            ))
        }),
    }
}

/// Continuation tokens are the URL-safe base64 of the last key returned.
pub fn encode_continuation_token(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key.as_bytes())
}

pub fn decode_continuation_token(token: &str) -> Result<String, AppError> {
    URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| {
            AppError::InvalidArgument("The continuation token provided is incorrect".into())
        })
}

pub async fn list_buckets(State(state): State<AppState>) -> Result<Response, AppError> {
    let names = state.collections.snapshot().into_iter().map(|(name, _)| name);
    let doc = ListAllMyBucketsResult::new(names, state.collections.refreshed_at());
    Ok(xml_response(xml::render(&doc)?))
}

pub async fn head_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.collections.contains(&bucket) {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NoSuchBucket(bucket))
    }
}

pub async fn list_objects(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Query(query): Query<ListObjectsQuery>,
) -> Result<Response, AppError> {
    let max_keys = parse_max_keys(query.max_keys.as_deref())?;
    let prefix = query.prefix.clone().unwrap_or_default();
    let delimiter = query.delimiter.clone().unwrap_or_default();

    if query.is_v2() {
        let continuation_token = query.continuation_token.clone().filter(|t| !t.is_empty());
        let start_after = match &continuation_token {
            Some(token) => decode_continuation_token(token)?,
            None => query.start_after.clone().unwrap_or_default(),
        };
        let params = ListingParams {
            prefix: prefix.clone(),
            delimiter: delimiter.clone(),
            start_after,
            max_keys,
        };
        let listing = object_service::list_objects(&state, &bucket, &params).await?;
        let next_token = if listing.is_truncated {
            listing.last_returned().map(encode_continuation_token)
        } else {
            None
        };
        tracing::info!(
            bucket = %bucket,
            prefix = %prefix,
            objects = listing.objects.len(),
            truncated = listing.is_truncated,
            "ListObjectsV2"
        );
        let echo = ListingEcho {
            bucket: &bucket,
            prefix: &prefix,
            delimiter: &delimiter,
            max_keys,
        };
        let doc = ListBucketResultV2::new(
            echo,
            continuation_token,
            query.start_after.clone().filter(|s| !s.is_empty()),
            next_token,
            listing,
        );
        return Ok(xml_response(xml::render(&doc)?));
    }

    let marker = query.marker.clone().unwrap_or_default();
    let params = ListingParams {
        prefix: prefix.clone(),
        delimiter: delimiter.clone(),
        start_after: marker.clone(),
        max_keys,
    };
    let listing = object_service::list_objects(&state, &bucket, &params).await?;
    tracing::info!(
        bucket = %bucket,
        prefix = %prefix,
        objects = listing.objects.len(),
        truncated = listing.is_truncated,
        "ListObjects"
    );
    let echo = ListingEcho {
        bucket: &bucket,
        prefix: &prefix,
        delimiter: &delimiter,
        max_keys,
    };
    let doc = ListBucketResultV1::new(echo, &marker, listing);
    Ok(xml_response(xml::render(&doc)?))
}

/// Writes are not supported; the gateway is read-only.
pub async fn not_implemented() -> AppError {
    AppError::NotImplemented("the gateway is read-only".into())
}
