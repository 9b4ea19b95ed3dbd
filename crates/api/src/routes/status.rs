//! Liveness endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "notification-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
