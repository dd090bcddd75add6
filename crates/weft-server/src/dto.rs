//! Data transfer objects for the HTTP and WebSocket surfaces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use weft_core::{Edge, Node};

// === Run ===

/// Parameters injected into a run.
#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    pub task: Option<String>,
}

/// Request to run a template or a saved workflow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub template_id: Option<String>,
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub params: Option<RunParams>,
}

/// Result of a run.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub success: bool,
    pub result: String,
}

// === Chat ===

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default = "default_true")]
    pub execute_commands: bool,
}

fn default_true() -> bool {
    true
}

/// Response from creating a chat session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
    pub session_id: String,
}

// === Tools ===

/// Result of a direct tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolInvokeResponse {
    pub success: bool,
    pub result: Value,
}

// === Workflows ===

/// Request to create or update a saved workflow.
#[derive(Debug, Deserialize)]
pub struct SaveWorkflowRequest {
    /// Update this workflow when set; create otherwise.
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Request to rename a saved workflow.
#[derive(Debug, Deserialize)]
pub struct RenameWorkflowRequest {
    pub name: String,
}

/// Request to duplicate a saved workflow.
#[derive(Debug, Default, Deserialize)]
pub struct DuplicateWorkflowRequest {
    pub name: Option<String>,
}

// === WebSocket control protocol ===

/// An incoming control message: `{id, type, payload}`.
#[derive(Debug, Deserialize)]
pub struct WsRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// A control reply: `{id, success, result|error}`.
#[derive(Debug, Serialize)]
pub struct WsReply {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WsReply {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}
