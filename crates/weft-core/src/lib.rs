//! Core domain types shared across the weft framework:
//!
//! - [`Workflow`], [`Node`], [`Edge`] — the workflow document model
//! - [`Port`], [`NodeCategory`], [`ToolSchema`] — node/tool descriptors
//! - [`ProgressEvent`], [`ProgressSink`] — execution observation
//! - [`OrchestratorMemory`] — ReAct loop state
//! - [`WorkflowError`] — document-level errors
//!
//! # Example
//!
//! ```rust
//! use weft_core::{Node, Workflow};
//!
//! let doc = Workflow::new("wf_demo", "Demo")
//!     .with_node(Node::new("text-1", "text-input", "Text"))
//!     .with_node(Node::new("debug-1", "debug", "Debug"))
//!     .with_edge("e1", "text-1", "debug-1");
//!
//! assert_eq!(doc.nodes.len(), 2);
//! assert_eq!(doc.edges.len(), 1);
//! ```

mod events;
mod memory;
mod schema;
mod workflow;

pub use events::{NodeStatus, NullSink, ProgressEvent, ProgressSink};
pub use memory::{OrchestratorMemory, OrchestratorStatus, OrchestratorStep};
pub use schema::{NodeCategory, Port, ToolSchema};
pub use workflow::{
    Edge, Node, NodeData, Position, Workflow, WorkflowError, TOOLS_HANDLE, TOOL_NODE_PREFIX,
};

/// A map of port name to value, as produced and consumed by node executors.
pub type PortMap = serde_json::Map<String, serde_json::Value>;
