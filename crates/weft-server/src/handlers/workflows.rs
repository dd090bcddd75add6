//! Saved-workflow CRUD handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use weft_builder::register_workflow_tools;
use weft_nodes::install_tool_nodes;
use weft_store::SavedWorkflow;

use crate::dto::{DuplicateWorkflowRequest, RenameWorkflowRequest, SaveWorkflowRequest};
use crate::error::AppError;
use crate::ServerState;

/// Refreshes the workflow-as-tool registrations after a store change.
fn refresh_workflow_tools(state: &ServerState) {
    register_workflow_tools(&state.store, &state.engine, &state.tools, &state.nodes);
    install_tool_nodes(&state.nodes, &state.tools);
}

/// Lists all saved workflows, most recently updated first.
pub async fn list(State(state): State<Arc<ServerState>>) -> Json<Vec<SavedWorkflow>> {
    Json(state.store.list())
}

/// Creates or updates a saved workflow.
pub async fn save(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<SaveWorkflowRequest>,
) -> Result<Json<SavedWorkflow>, AppError> {
    let saved = state
        .store
        .save(
            &req.name,
            req.nodes,
            req.edges,
            req.description.as_deref(),
            req.id.as_deref(),
        )
        .map_err(|e| AppError::Internal(e.to_string()))?;

    refresh_workflow_tools(&state);
    info!("Saved workflow '{}' ({})", saved.name, saved.id);
    Ok(Json(saved))
}

/// Gets one saved workflow.
pub async fn get(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<SavedWorkflow>, AppError> {
    state
        .store
        .get(&id)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("workflow not found: {id}")))
}

/// Updates a saved workflow in place.
pub async fn update(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<SaveWorkflowRequest>,
) -> Result<Json<SavedWorkflow>, AppError> {
    if state
        .store
        .get(&id)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .is_none()
    {
        return Err(AppError::NotFound(format!("workflow not found: {id}")));
    }

    let saved = state
        .store
        .save(
            &req.name,
            req.nodes,
            req.edges,
            req.description.as_deref(),
            Some(&id),
        )
        .map_err(|e| AppError::Internal(e.to_string()))?;

    refresh_workflow_tools(&state);
    Ok(Json(saved))
}

/// Deletes a saved workflow.
pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let deleted = state
        .store
        .delete(&id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !deleted {
        return Err(AppError::NotFound(format!("workflow not found: {id}")));
    }
    Ok(Json(json!({ "success": true })))
}

/// Renames a saved workflow.
pub async fn rename(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameWorkflowRequest>,
) -> Result<Json<SavedWorkflow>, AppError> {
    let renamed = state
        .store
        .rename(&id, &req.name)
        .map_err(|e| match e {
            weft_store::StoreError::NotFound(id) => {
                AppError::NotFound(format!("workflow not found: {id}"))
            }
            other => AppError::Internal(other.to_string()),
        })?;
    Ok(Json(renamed))
}

/// Duplicates a saved workflow under a fresh id.
pub async fn duplicate(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<DuplicateWorkflowRequest>,
) -> Result<Json<SavedWorkflow>, AppError> {
    let copy = state
        .store
        .duplicate(&id, req.name.as_deref())
        .map_err(|e| match e {
            weft_store::StoreError::NotFound(id) => {
                AppError::NotFound(format!("workflow not found: {id}"))
            }
            other => AppError::Internal(other.to_string()),
        })?;

    refresh_workflow_tools(&state);
    Ok(Json(copy))
}
