use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::services::upstream::UpstreamError;
use crate::xml::{self, ErrorDocument, XML_CONTENT_TYPE};

pub const REQUEST_ID_HEADER: &str = "x-amz-request-id";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("The specified bucket does not exist: {0}")]
    NoSuchBucket(String),

    #[error("The specified key does not exist: {0}")]
    NoSuchKey(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoSuchBucket(_) | AppError::NoSuchKey(_) => StatusCode::NOT_FOUND,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(e) => match e {
                UpstreamError::CollectionNotFound(_) | UpstreamError::ObjectNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                UpstreamError::AuthenticationFailed => StatusCode::FORBIDDEN,
                UpstreamError::FileServerNotConfigured => StatusCode::NOT_IMPLEMENTED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// S3 error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NoSuchBucket(_) => "NoSuchBucket",
            AppError::NoSuchKey(_) => "NoSuchKey",
            AppError::NotImplemented(_) => "NotImplemented",
            AppError::InvalidArgument(_) => "InvalidArgument",
            AppError::AccessDenied(_) => "AccessDenied",
            AppError::ServiceUnavailable(_) => "ServiceUnavailable",
            AppError::Internal(_) => "InternalError",
            AppError::Upstream(e) => match e {
                UpstreamError::CollectionNotFound(_) => "NoSuchBucket",
                UpstreamError::ObjectNotFound(_) => "NoSuchKey",
                UpstreamError::AuthenticationFailed => "AccessDenied",
                UpstreamError::FileServerNotConfigured => "NotImplemented",
                _ => "InternalError",
            },
        }
    }

    fn resource(&self) -> String {
        match self {
            AppError::NoSuchBucket(name) | AppError::NoSuchKey(name) => name.clone(),
            _ => String::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, code = self.code(), error = %self);
        } else {
            tracing::debug!(status = %status, code = self.code(), error = %self);
        }

        let doc = ErrorDocument {
            code: self.code(),
            message: self.to_string(),
            resource: self.resource(),
            request_id: String::new(),
        };
        let mut response = error_body(status, &doc);
        response.extensions_mut().insert(doc);
        response
    }
}

fn error_body(status: StatusCode, doc: &ErrorDocument) -> Response {
    match xml::render(doc) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE))],
            body,
        )
            .into_response(),
        Err(_) => status.into_response(),
    }
}

/// Completes error documents with the request path and request id, which
/// are only known at the router level.
pub async fn complete_error_document(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let path = request.uri().path().to_string();
    let is_head = request.method() == Method::HEAD;

    let response = next.run(request).await;
    if is_head {
        return response;
    }
    let Some(mut doc) = response.extensions().get::<ErrorDocument>().cloned() else {
        return response;
    };

    if doc.resource.is_empty() {
        doc.resource = path;
    }
    doc.request_id = request_id;
    let (parts, _) = response.into_parts();
    let mut completed = error_body(parts.status, &doc);
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_LENGTH {
            completed.headers_mut().insert(name.clone(), value.clone());
        }
    }
    completed
}
