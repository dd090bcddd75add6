//! HTTP/WebSocket server entry point.
//!
//! Composes the core explicitly at startup (registries, engine, store,
//! builder, chat) and serves the control plane on one Axum router.

mod dto;
mod error;
mod handlers;
mod service;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use weft_builder::{register_builder_tools, register_workflow_tools, BuilderContext};
use weft_chat::ChatDispatcher;
use weft_engine::Engine;
use weft_llm::{discover_models, Llm, OllamaClient};
use weft_nodes::{
    install_builtins, install_orchestrator_node, install_tool_nodes, NodeRegistry,
};
use weft_store::{seed_store, TemplateRegistry, WorkflowStore};
use weft_tools::ToolRegistry;

use crate::service::BroadcastSink;
use crate::ws::UiRelay;

/// Shared server state accessible from all handlers.
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub nodes: Arc<NodeRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub store: Arc<WorkflowStore>,
    pub templates: Arc<TemplateRegistry>,
    pub chat: Arc<ChatDispatcher>,
    pub progress: Arc<BroadcastSink>,
    pub ui_relay: UiRelay,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().expect("valid filter")),
        )
        .compact()
        .init();

    let state = Arc::new(init_server_state().await?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/tools", get(handlers::tools::list))
        .route("/tools/{name}", post(handlers::tools::invoke))
        .route("/templates", get(handlers::templates::list))
        .route("/templates/{id}", get(handlers::templates::get))
        .route("/run", post(handlers::run::run))
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/sessions", get(handlers::chat::list_sessions))
        .route("/chat/new", post(handlers::chat::new_session))
        .route(
            "/chat/{id}",
            get(handlers::chat::get_session).delete(handlers::chat::delete_session),
        )
        .route("/chat/{id}/workflow", get(handlers::chat::session_workflow))
        .route(
            "/workflows",
            get(handlers::workflows::list).post(handlers::workflows::save),
        )
        .route(
            "/workflows/{id}",
            get(handlers::workflows::get)
                .put(handlers::workflows::update)
                .delete(handlers::workflows::delete),
        )
        .route("/workflows/{id}/rename", post(handlers::workflows::rename))
        .route(
            "/workflows/{id}/duplicate",
            post(handlers::workflows::duplicate),
        )
        .layer(trace_layer);

    let app = Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .with_state(state);

    let addr = env_or("WEFT_ADDR", "0.0.0.0:8787");
    info!("Starting weft server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the core: LLM client, registries, store, builder, chat.
/// Registration completes before anything executes.
async fn init_server_state() -> Result<ServerState> {
    let ollama_host = env_or("OLLAMA_HOST", "http://127.0.0.1:11434");
    let model = env_or("WEFT_MODEL", "llama3.2");
    let data_dir = env_or("WEFT_DATA_DIR", "data");
    let plugin_dir = env_or("WEFT_PLUGIN_DIR", "plugins");

    match discover_models(&ollama_host).await {
        Ok(models) => {
            info!("Ollama models available: {}", models.join(", "));
            if !models.iter().any(|m| m == &model) {
                warn!("Configured model '{model}' not among discovered models");
            }
        }
        Err(e) => warn!("Ollama discovery failed (is Ollama running?): {e}"),
    }
    let llm: Arc<dyn Llm> = Arc::new(OllamaClient::new(&model, &ollama_host));
    info!("Using model '{model}' at {ollama_host}");

    let store = Arc::new(WorkflowStore::new(
        std::path::Path::new(&data_dir).join("workflows"),
    )?);
    seed_store(&store)?;

    let mut templates = TemplateRegistry::with_builtins();
    let template_dir = std::path::Path::new(&data_dir).join("templates");
    if template_dir.is_dir() {
        if let Err(e) = templates.load_from_dir(&template_dir) {
            warn!("Failed to load templates: {e}");
        }
    }
    let templates = Arc::new(templates);

    let tools = Arc::new(ToolRegistry::with_defaults());
    let nodes = Arc::new(NodeRegistry::new());
    install_builtins(&nodes);
    install_orchestrator_node(&nodes);

    let engine = Arc::new(Engine::new(
        Arc::clone(&nodes),
        Arc::clone(&tools),
        Arc::clone(&llm),
    ));

    let builder = BuilderContext::new(Arc::clone(&engine), Arc::clone(&store));
    register_builder_tools(&tools, Arc::clone(&builder));

    let plugins = match weft_plugin::load_plugins(std::path::Path::new(&plugin_dir), &tools, &nodes)
    {
        Ok(manifests) => manifests,
        Err(e) => {
            warn!("Plugin loading failed: {e}");
            Vec::new()
        }
    };
    let plugin_names: Vec<String> = plugins.iter().map(|m| m.name.clone()).collect();

    register_workflow_tools(&store, &engine, &tools, &nodes);
    // Tool nodes last, so every registered tool gets a canvas presence.
    install_tool_nodes(&nodes, &tools);
    info!(
        "Registered {} tools, {} node types",
        tools.len(),
        nodes.len()
    );

    let chat = Arc::new(ChatDispatcher::new(
        Arc::clone(&llm),
        Arc::clone(&engine),
        Arc::clone(&store),
        Arc::clone(&templates),
        builder,
        plugin_names,
    ));

    Ok(ServerState {
        engine,
        nodes,
        tools,
        store,
        templates,
        chat,
        progress: Arc::new(BroadcastSink::new(256)),
        ui_relay: UiRelay::new(),
    })
}
