//! Shared execution plumbing for the HTTP and WebSocket surfaces.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;

use weft_core::{ProgressEvent, ProgressSink, Workflow};
use weft_engine::extract_primary_result;

use crate::error::AppError;
use crate::ServerState;

/// Fans execution events out to every WebSocket subscriber. Slow
/// subscribers lose events; the engine never blocks on observers.
pub struct BroadcastSink {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }
}

impl ProgressSink for BroadcastSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Resolves a run target: a template id or a saved-workflow id.
pub fn resolve_run_document(
    state: &ServerState,
    template_id: Option<&str>,
    workflow_id: Option<&str>,
) -> Result<Workflow, AppError> {
    if let Some(id) = template_id {
        return state
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("template not found: {id}")));
    }
    if let Some(id) = workflow_id {
        return state
            .store
            .get(id)
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map(|saved| saved.to_workflow())
            .ok_or_else(|| AppError::NotFound(format!("workflow not found: {id}")));
    }
    Err(AppError::BadRequest(
        "templateId or workflowId required".into(),
    ))
}

/// Runs a document with progress broadcast, optionally injecting a
/// task into its first text-input node, and condenses the result.
pub async fn run_document(
    state: &ServerState,
    mut doc: Workflow,
    task: Option<&str>,
) -> Result<String, AppError> {
    if let Some(task) = task {
        if let Some(node) = doc.nodes.iter_mut().find(|n| n.type_id() == "text-input") {
            node.data.config.insert("text".into(), json!(task));
        }
    }

    let sink = Arc::clone(&state.progress) as Arc<dyn ProgressSink>;
    let result = state.engine.execute(&doc, sink).await;

    if !result.success {
        return Err(AppError::Internal(
            result.error.unwrap_or_else(|| "execution failed".into()),
        ));
    }

    Ok(extract_primary_result(&doc, &result.outputs)
        .unwrap_or_else(|| "Workflow completed".to_string()))
}
