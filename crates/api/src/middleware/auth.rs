//! Shared API key check for the public API.
//!
//! When `API_KEY` is configured every request under `/public-api/v1` must
//! carry it in the `x-api-key` header. Without a configured key the check is
//! skipped.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use gateway_common::error::AppError;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(uri = %request.uri(), "Rejected request with invalid API key");
            Err(AppError::Auth("Invalid API key".to_string()))
        }
        None => Err(AppError::Auth(format!(
            "Missing API key. Use '{}: <key>'",
            API_KEY_HEADER
        ))),
    }
}
