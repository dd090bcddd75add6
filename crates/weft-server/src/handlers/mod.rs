//! HTTP route handlers.

pub mod chat;
pub mod run;
pub mod templates;
pub mod tools;
pub mod workflows;

use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "weft" }))
}
