//! Chat sessions with sliding 30-minute expiry, plus the per-session
//! canvas the command executor mutates.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use weft_core::{Edge, Node, Workflow};

/// Sessions expire after this much inactivity.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// Who sent a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message in a chat session.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The workflow canvas a session's commands operate on.
#[derive(Debug, Clone, Serialize)]
pub struct CanvasState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub next_id: usize,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_id: 1,
        }
    }
}

/// Numeric suffix of an id like `node_12`; anything else counts as 0.
fn numeric_suffix(id: &str) -> usize {
    id.rsplit('_')
        .next()
        .and_then(|tail| tail.parse().ok())
        .unwrap_or(0)
}

impl CanvasState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Replaces the canvas contents, continuing the id sequence after
    /// the highest numeric suffix among the loaded node ids.
    pub fn set_contents(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.next_id = nodes.iter().map(|n| numeric_suffix(&n.id)).max().unwrap_or(0) + 1;
        self.nodes = nodes;
        self.edges = edges;
    }

    /// The canvas as an executable workflow document.
    pub fn to_workflow(&self, id: &str, name: &str) -> Workflow {
        Workflow {
            id: id.to_string(),
            name: name.to_string(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// The canvas as a plain JSON document.
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "nodes": self.nodes, "edges": self.edges })
    }
}

/// A chat session: conversation memory plus the canvas state.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(skip)]
    pub canvas: CanvasState,
}

impl ChatSession {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
            canvas: CanvasState::default(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity > Duration::minutes(SESSION_TTL_MINUTES)
    }
}

/// Listing entry for a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// The process-wide session map. Expiry is evaluated lazily on access
/// and eagerly when listing.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh session and returns its id.
    pub fn create(&self) -> String {
        let session = ChatSession::new();
        let id = session.id.clone();
        self.sessions
            .write()
            .expect("session lock")
            .insert(id.clone(), session);
        id
    }

    /// Runs a closure against a live session, bumping its activity
    /// timestamp. Returns `None` (and evicts) when the session is
    /// unknown or expired.
    pub fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut ChatSession) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.write().expect("session lock");
        let now = Utc::now();

        if sessions.get(id).is_some_and(|s| s.is_expired(now)) {
            debug!("Evicting expired session {id}");
            sessions.remove(id);
            return None;
        }

        let session = sessions.get_mut(id)?;
        session.last_activity = now;
        Some(f(session))
    }

    /// A clone of a live session, bumping its activity timestamp.
    pub fn get(&self, id: &str) -> Option<ChatSession> {
        self.with_session(id, |session| session.clone())
    }

    /// Summaries of all live sessions, evicting expired ones eagerly.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut sessions = self.sessions.write().expect("session lock");
        let now = Utc::now();
        sessions.retain(|_, s| !s.is_expired(now));

        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .map(|s| SessionSummary {
                id: s.id.clone(),
                message_count: s.messages.len(),
                created_at: s.created_at,
                last_activity: s.last_activity,
            })
            .collect();
        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        summaries
    }

    /// Deletes a session. Returns `false` when it did not exist.
    pub fn delete(&self, id: &str) -> bool {
        self.sessions
            .write()
            .expect("session lock")
            .remove(id)
            .is_some()
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, minutes: i64) {
        let mut sessions = self.sessions.write().expect("session lock");
        if let Some(session) = sessions.get_mut(id) {
            session.last_activity = Utc::now() - Duration::minutes(minutes);
        }
    }
}
