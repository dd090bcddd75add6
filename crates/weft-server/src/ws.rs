//! WebSocket control surface.
//!
//! Clients exchange `{id, type, payload}` requests for
//! `{id, success, result|error}` replies. `workflow:*` messages are
//! handled in-core; anything else is relayed to registered UI clients,
//! which get 30 seconds to answer before the requester sees a timeout.
//! Every connected socket also receives the engine's progress events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::dto::{WsRequest, WsReply};
use crate::service::{resolve_run_document, run_document};
use crate::ServerState;

/// How long a relayed request waits for the UI's answer.
const UI_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

type Outbound = mpsc::UnboundedSender<String>;

/// Routes control messages to registered UI clients and pairs their
/// answers with the waiting requests.
#[derive(Default)]
pub struct UiRelay {
    ui_clients: RwLock<Vec<Outbound>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
}

impl UiRelay {
    pub fn new() -> Self {
        Self::default()
    }

    async fn register_ui(&self, tx: Outbound) {
        let mut clients = self.ui_clients.write().await;
        clients.retain(|c| !c.is_closed());
        clients.push(tx);
        info!("UI client registered ({} connected)", clients.len());
    }

    /// Forwards a raw request to the UI clients and waits for an answer
    /// matching its id.
    async fn relay(&self, id: &str, raw: &str) -> Result<Value, String> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.to_string(), tx);

        {
            let mut clients = self.ui_clients.write().await;
            clients.retain(|c| c.send(raw.to_string()).is_ok());
            if clients.is_empty() {
                self.pending.lock().await.remove(id);
                return Err("no UI connected".to_string());
            }
        }

        match tokio::time::timeout(UI_RESPONSE_TIMEOUT, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err("UI connection dropped".to_string()),
            Err(_) => {
                self.pending.lock().await.remove(id);
                Err("UI response timeout".to_string())
            }
        }
    }

    /// Pairs a UI answer with its waiting request.
    async fn resolve(&self, id: &str, value: Value) {
        if let Some(tx) = self.pending.lock().await.remove(id) {
            let _ = tx.send(value);
        } else {
            debug!("No pending request for response id {id}");
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sender, mut receiver) = socket.split();

    // A single writer task owns the sink; request handling and the
    // progress feed both write through this channel.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Mirror engine progress events to this client.
    let progress_tx = tx.clone();
    let mut progress_rx = state.progress.subscribe();
    let progress_task = tokio::spawn(async move {
        while let Ok(event) = progress_rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else { continue };
            if progress_tx.send(text).is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                error!("WS receive error: {e}");
                break;
            }
        };
        let Message::Text(text) = message else { continue };

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Malformed WS payload: {e}");
                continue;
            }
        };

        if value.get("type").is_some() {
            let request: WsRequest = match serde_json::from_value(value) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Malformed WS request: {e}");
                    continue;
                }
            };
            let reply = handle_request(&state, &tx, &text, request).await;
            send_reply(&tx, reply);
        } else if let Some(id) = value.get("id").and_then(Value::as_str) {
            // An answer from a UI client to a relayed request.
            let id = id.to_string();
            state.ui_relay.resolve(&id, value).await;
        }
    }

    // The relay may still hold a clone of `tx` for a registered UI
    // client, so the writer is aborted rather than drained.
    progress_task.abort();
    writer.abort();
    info!("WS connection closed");
}

fn send_reply(tx: &Outbound, reply: WsReply) {
    match serde_json::to_string(&reply) {
        Ok(text) => {
            let _ = tx.send(text);
        }
        Err(e) => error!("Cannot serialize WS reply: {e}"),
    }
}

async fn handle_request(
    state: &Arc<ServerState>,
    tx: &Outbound,
    raw: &str,
    request: WsRequest,
) -> WsReply {
    match request.kind.as_str() {
        "ui:register" => {
            state.ui_relay.register_ui(tx.clone()).await;
            WsReply::ok(request.id, json!({ "registered": true }))
        }
        "workflow:listTemplates" => match serde_json::to_value(state.templates.list()) {
            Ok(list) => WsReply::ok(request.id, list),
            Err(e) => WsReply::err(request.id, e.to_string()),
        },
        "workflow:runTemplate" => {
            let template_id = request
                .payload
                .get("templateId")
                .and_then(Value::as_str)
                .map(String::from);
            let task = request
                .payload
                .get("params")
                .and_then(|p| p.get("task"))
                .and_then(Value::as_str)
                .map(String::from);

            let doc = match resolve_run_document(state, template_id.as_deref(), None) {
                Ok(doc) => doc,
                Err(_) => {
                    return WsReply::err(
                        request.id,
                        format!(
                            "template not found: {}",
                            template_id.unwrap_or_else(|| "<missing>".into())
                        ),
                    )
                }
            };

            match run_document(state, doc, task.as_deref()).await {
                Ok(result) => WsReply::ok(request.id, json!({ "result": result })),
                Err(e) => {
                    let body = match e {
                        crate::error::AppError::NotFound(m)
                        | crate::error::AppError::BadRequest(m)
                        | crate::error::AppError::Internal(m) => m,
                    };
                    WsReply::err(request.id, body)
                }
            }
        }
        _ => match state.ui_relay.relay(&request.id, raw).await {
            Ok(result) => WsReply::ok(request.id, result),
            Err(e) => WsReply::err(request.id, e),
        },
    }
}
