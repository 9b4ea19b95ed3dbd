pub mod notifications;
pub mod status;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use gateway_common::error::AppError;

use crate::middleware::auth::require_api_key;
use crate::middleware::query_params::reject_unknown_query_params;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the complete API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let public_api = notifications::router()
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(status::router())
        .nest("/public-api/v1", public_api)
        .fallback(not_found)
        .layer(from_fn(reject_unknown_query_params))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Resource not found".to_string())
}
