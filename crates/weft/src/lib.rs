//! # Weft — node-graph workflow engine for local AI automation
//!
//! Weft executes workflows described as directed graphs of typed nodes:
//! data sources, HTTP/file I/O, LLM calls, and autonomous tool-calling
//! agents. Progress streams to observers while the engine walks the
//! graph in topological order.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use weft::prelude::*;
//! use std::sync::Arc;
//!
//! // Registries and the LLM facade.
//! let nodes = Arc::new(NodeRegistry::new());
//! install_builtins(&nodes);
//! install_orchestrator_node(&nodes);
//! let tools = Arc::new(ToolRegistry::with_defaults());
//! install_tool_nodes(&nodes, &tools);
//! let llm: Arc<dyn Llm> = Arc::new(OllamaClient::new("llama3.2", "http://127.0.0.1:11434"));
//!
//! // A workflow: question → model → debug.
//! let doc = Workflow::new("wf_demo", "Demo")
//!     .with_node(Node::new("q", "text-input", "Question")
//!         .with_config("text", serde_json::json!("What is 2+2?")))
//!     .with_node(Node::new("a", "ai-chat", "Answer"))
//!     .with_node(Node::new("d", "debug", "Debug"))
//!     .with_edge("e1", "q", "a")
//!     .with_edge("e2", "a", "d");
//!
//! let engine = Engine::new(nodes, tools, llm);
//! let result = engine.execute(&doc, Arc::new(NullSink)).await;
//! assert!(result.success);
//! ```
//!
//! ## Crate structure
//!
//! | Crate | Description |
//! |-------|-------------|
//! | [`weft_core`] | Workflow model, ports, progress events |
//! | [`weft_llm`] | LLM facade (Ollama, scripted test client) |
//! | [`weft_tools`] | Tool trait, registry, built-in tools |
//! | [`weft_nodes`] | Node-type registry and built-in executors |
//! | [`weft_engine`] | Topological execution engine |
//! | [`weft_orchestrator`] | Bounded ReAct loop |
//! | [`weft_store`] | Workflow persistence and templates |
//! | [`weft_plugin`] | Plugin manifest loading |
//! | [`weft_builder`] | Builder tools and workflow-as-tool |
//! | [`weft_chat`] | Chat dispatcher and command executor |

// Core model
pub use weft_core::{
    Edge, Node, NodeCategory, NodeData, NodeStatus, NullSink, OrchestratorMemory,
    OrchestratorStatus, OrchestratorStep, Port, PortMap, Position, ProgressEvent, ProgressSink,
    ToolSchema, Workflow, WorkflowError, TOOLS_HANDLE, TOOL_NODE_PREFIX,
};

// LLM facade
pub use weft_llm::{
    discover_models, ChatMessage, GenerateOptions, Llm, LlmError, LlmSession, OllamaClient, Role,
    ScriptedLlm,
};

// Tools
pub use weft_tools::{
    CalculatorTool, DatetimeTool, HttpRequestTool, ReadFileTool, Tool, ToolError, ToolRegistry,
    WriteFileTool,
};

// Nodes
pub use weft_nodes::{
    install_builtins, install_orchestrator_node, install_tool_nodes, ExecutionContext, NodeError,
    NodeExecutor, NodeRegistry, NodeTypeDefinition,
};

// Engine
pub use weft_engine::{extract_primary_result, CycleError, Engine, ExecutionResult};

// Orchestrator
pub use weft_orchestrator::{
    Directive, EventCallback, Orchestrator, OrchestratorConfig, OrchestratorEvent,
};

// Persistence
pub use weft_store::{
    builder_workflow, seed_store, SavedWorkflow, StoreError, TemplateRegistry, WorkflowStore,
};

// Plugins
pub use weft_plugin::{load_plugins, PluginError, PluginManifest, PluginTool, PluginToolDecl};

// Builder & workflow-as-tool
pub use weft_builder::{
    register_builder_tools, register_workflow_tools, BuilderContext, BuilderState, MAX_TOOL_DEPTH,
};

// Chat
pub use weft_chat::{
    extract_commands, is_build_request, BuildResult, ChatDispatcher, ChatOutcome, ChatSession,
    CommandExecutor, CommandResult, SessionStore,
};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use weft::prelude::*;
/// ```
pub mod prelude {
    // Core model
    pub use crate::{Edge, Node, NullSink, ProgressEvent, ProgressSink, Workflow};

    // LLM
    pub use crate::{GenerateOptions, Llm, OllamaClient, ScriptedLlm};

    // Registries
    pub use crate::{
        install_builtins, install_orchestrator_node, install_tool_nodes, NodeRegistry,
        ToolRegistry,
    };

    // Engine & orchestrator
    pub use crate::{extract_primary_result, Engine, Orchestrator, OrchestratorConfig};

    // Tools
    pub use crate::{Tool, ToolError, ToolSchema};

    // Persistence & chat
    pub use crate::{ChatDispatcher, SavedWorkflow, TemplateRegistry, WorkflowStore};
}
