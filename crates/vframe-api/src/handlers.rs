//! HTTP handlers.

pub mod videos;

use axum::Json;
use serde_json::json;

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
