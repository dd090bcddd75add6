//! Workflow execution handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::dto::{RunRequest, RunResponse};
use crate::error::AppError;
use crate::service::{resolve_run_document, run_document};
use crate::ServerState;

/// Runs a template or saved workflow, optionally injecting
/// `params.task` into its first text-input node.
pub async fn run(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let doc = resolve_run_document(
        &state,
        req.template_id.as_deref(),
        req.workflow_id.as_deref(),
    )?;
    info!("Running '{}' over HTTP", doc.name);

    let task = req.params.as_ref().and_then(|p| p.task.as_deref());
    let result = run_document(&state, doc, task).await?;

    Ok(Json(RunResponse {
        success: true,
        result,
    }))
}
