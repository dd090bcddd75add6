//! Tool listing and direct invocation handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use tracing::info;

use weft_core::ToolSchema;

use crate::dto::ToolInvokeResponse;
use crate::error::AppError;
use crate::ServerState;

/// Lists all registered tools.
pub async fn list(State(state): State<Arc<ServerState>>) -> Json<Vec<ToolSchema>> {
    Json(state.tools.list())
}

/// Invokes a tool directly with the request body as its arguments.
pub async fn invoke(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<ToolInvokeResponse>, AppError> {
    let tool = state
        .tools
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("tool not found: {name}")))?;

    info!("Invoking tool '{name}' over HTTP");
    let result = tool
        .execute(args)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ToolInvokeResponse {
        success: true,
        result,
    }))
}
