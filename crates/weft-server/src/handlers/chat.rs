//! Chat endpoints: messaging plus session CRUD.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use weft_chat::{ChatOutcome, ChatSession, SessionSummary};

use crate::dto::{ChatRequest, NewSessionResponse};
use crate::error::AppError;
use crate::ServerState;

/// Handles one chat message.
pub async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ChatRequest>,
) -> Json<ChatOutcome> {
    let outcome = state
        .chat
        .chat(req.session_id.as_deref(), &req.message, req.execute_commands)
        .await;
    Json(outcome)
}

/// Lists live chat sessions (evicting expired ones).
pub async fn list_sessions(State(state): State<Arc<ServerState>>) -> Json<Vec<SessionSummary>> {
    Json(state.chat.sessions().list())
}

/// Creates a fresh chat session.
pub async fn new_session(State(state): State<Arc<ServerState>>) -> Json<NewSessionResponse> {
    Json(NewSessionResponse {
        session_id: state.chat.sessions().create(),
    })
}

/// Gets one session's conversation.
pub async fn get_session(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<ChatSession>, AppError> {
    state
        .chat
        .sessions()
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("session not found: {id}")))
}

/// Deletes a session.
pub async fn delete_session(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if state.chat.sessions().delete(&id) {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(AppError::NotFound(format!("session not found: {id}")))
    }
}

/// The session's current canvas as a workflow document.
pub async fn session_workflow(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .chat
        .sessions()
        .get(&id)
        .map(|session| Json(session.canvas.to_json()))
        .ok_or_else(|| AppError::NotFound(format!("session not found: {id}")))
}
