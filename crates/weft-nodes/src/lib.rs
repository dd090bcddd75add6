//! Node-type catalog for weft workflows.
//!
//! - [`NodeTypeDefinition`] — a node type: ports, category, config
//!   schema, executor, and (for tool nodes) the advertised tool schema
//! - [`NodeRegistry`] — process-wide catalog with hot registration
//! - [`ExecutionContext`] — what executors get: the LLM facade, the
//!   tool registry, logging, and progress reporting
//! - [`install_builtins`] / [`install_tool_nodes`] /
//!   [`install_orchestrator_node`] — the built-in node set
//!
//! Built-in node types:
//!
//! | Type id | Category | Behavior |
//! |---------|----------|----------|
//! | `trigger` | trigger | Starts a run, emits a timestamp |
//! | `text-input` | data | Emits its configured text |
//! | `ai-chat` | ai | One LLM call with a system prompt |
//! | `ai-transform` | ai | Rewrites content per an instruction |
//! | `ai-orchestrator` | ai | Bounded ReAct loop over attached tools |
//! | `debug` | output | Logs its input, passes it through |
//! | `http-request` | data | Fetches a URL |
//! | `file-read` / `file-write` | data | Local file I/O |
//! | `json-parse` | data | Parses JSON, optionally extracts a field |
//! | `loop` | data | Renders a template per item of a list |
//! | `tool-*` | tool | Advertise a tool schema; never execute |

mod ai;
mod basic;
mod context;
mod definition;
mod io;
mod orchestrate;
mod registry;

pub use context::ExecutionContext;
pub use definition::{NodeExecutor, NodeTypeDefinition};
pub use registry::{
    install_builtins, install_orchestrator_node, install_tool_nodes, NodeRegistry,
};

use thiserror::Error;

/// Reserved config key carrying the schemas of tools attached via
/// tool-attachment edges. Injected by the engine, never authored.
pub const CONNECTED_TOOLS_KEY: &str = "_connected_tools";

/// Reserved config key mapping attached tool names to the node ids
/// that provide them.
pub const TOOL_NODE_MAP_KEY: &str = "_tool_node_map";

/// Reserved config key carrying the executing node's id, so executors
/// can report progress against it.
pub const NODE_ID_KEY: &str = "_node_id";

/// Errors raised by node executors.
#[derive(Error, Debug)]
pub enum NodeError {
    /// The node's configuration is missing or invalid.
    #[error("invalid node config: {0}")]
    Config(String),

    /// A required input was missing or had the wrong shape.
    #[error("invalid node input: {0}")]
    Input(String),

    /// The LLM call failed.
    #[error(transparent)]
    Llm(#[from] weft_llm::LlmError),

    /// A tool invocation failed.
    #[error(transparent)]
    Tool(#[from] weft_tools::ToolError),

    /// The node type has no executor (tool nodes).
    #[error("node type '{0}' is not executable")]
    NotExecutable(String),
}
