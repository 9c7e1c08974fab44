use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;

use crate::error::AppError;
use crate::models::entry::Entry;
use crate::services::object_service;
use crate::state::AppState;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

fn object_response(
    status: StatusCode,
    entry: &Entry,
    key: &str,
    content_length: u64,
    body: Body,
) -> Result<Response, AppError> {
    let content_type = mime_guess::from_path(key).first_or_octet_stream();
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, content_length.to_string())
        .header(header::ETAG, entry.etag())
        .header(header::ACCEPT_RANGES, "none");
    if let Some(modified) = entry.modify_time() {
        builder = builder.header(header::LAST_MODIFIED, modified.format(HTTP_DATE).to_string());
    }
    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("failed to build response: {e}")))
}

fn not_modified(headers: &HeaderMap, entry: &Entry) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|inm| inm == entry.etag() || inm == "*")
}

pub async fn head_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let entry = object_service::find_object(&state, &bucket, &key, "head_object").await?;
    object_response(StatusCode::OK, &entry, &key, entry.size, Body::empty())
}

pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if state.config.file_server.is_none() {
        return Err(AppError::NotImplemented(
            "object content requires a configured file server".into(),
        ));
    }

    let entry = object_service::find_object(&state, &bucket, &key, "get_object").await?;
    if not_modified(&headers, &entry) {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, entry.etag())
            .body(Body::empty())
            .map_err(|e| AppError::Internal(format!("failed to build response: {e}")));
    }

    let content = object_service::object_content(&state, &bucket, &entry).await?;
    tracing::debug!(
        bucket = %bucket,
        key = %key,
        volume = %entry.volume,
        "Streaming object content"
    );
    let length = content.content_length.unwrap_or(entry.size);
    object_response(StatusCode::OK, &entry, &key, length, content.body)
}
