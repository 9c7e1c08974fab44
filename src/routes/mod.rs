pub mod buckets;
pub mod health;
pub mod objects;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::{complete_error_document, REQUEST_ID_HEADER};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Gateway introspection, outside the bucket namespace
    let gateway_routes = Router::new()
        .route("/_gateway/health", get(health::health))
        .route("/_gateway/status", get(health::status));

    // Path-style S3 API
    let s3_routes = Router::new()
        .route("/", get(buckets::list_buckets))
        .route(
            "/{bucket}",
            get(buckets::list_objects)
                .head(buckets::head_bucket)
                .put(buckets::not_implemented)
                .post(buckets::not_implemented)
                .delete(buckets::not_implemented),
        )
        .route(
            "/{bucket}/",
            get(buckets::list_objects).head(buckets::head_bucket),
        )
        .route(
            "/{bucket}/{*key}",
            get(objects::get_object)
                .head(objects::head_object)
                .put(buckets::not_implemented)
                .post(buckets::not_implemented)
                .delete(buckets::not_implemented),
        );

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    // Request ID
    let request_id = http::HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(gateway_routes)
        .merge(s3_routes)
        .layer(middleware::from_fn(complete_error_document))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
