//! Template listing handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use weft_core::Workflow;

use crate::error::AppError;
use crate::ServerState;

/// Lists all workflow templates.
pub async fn list(State(state): State<Arc<ServerState>>) -> Json<Vec<Workflow>> {
    Json(state.templates.list().to_vec())
}

/// Gets one template by id.
pub async fn get(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Workflow>, AppError> {
    state
        .templates
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("template not found: {id}")))
}
