//! The workflow document model: nodes, edges, and the reserved handles
//! that distinguish dataflow from tool attachment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Target handle reserved for tool-attachment edges. An edge whose
/// `target_handle` equals this value attaches a tool provider to an
/// orchestrator instead of carrying data.
pub const TOOLS_HANDLE: &str = "tools";

/// Node-type id prefix marking tool nodes. Tool nodes never execute in
/// dataflow; they only advertise a tool schema.
pub const TOOL_NODE_PREFIX: &str = "tool-";

/// Errors raised while loading or validating a workflow document.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Failed to parse a workflow document from JSON.
    #[error("failed to parse workflow: {0}")]
    Parse(#[from] serde_json::Error),

    /// An edge references a node id that is not in the document.
    #[error("edge '{edge_id}' references unknown node '{node_id}'")]
    UnresolvedEdge { edge_id: String, node_id: String },

    /// The executable subgraph contains a cycle.
    #[error("cycle detected in workflow '{0}'")]
    Cycle(String),
}

/// Canvas position of a node. Opaque to the engine; carried for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The typed payload of a node: display label, node-type id, and the
/// node-type-specific configuration map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    /// Resolves against the node registry.
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// A node instance in a workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Always `"custom"` on the wire; the behavioral type lives in `data.type`.
    #[serde(rename = "type", default = "default_display_type")]
    pub display_type: String,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
}

fn default_display_type() -> String {
    "custom".to_string()
}

impl Node {
    /// Creates a node with an empty configuration.
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_type: default_display_type(),
            position: Position::default(),
            data: NodeData {
                label: label.into(),
                type_id: type_id.into(),
                config: Map::new(),
            },
        }
    }

    /// Sets the canvas position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Adds a configuration entry.
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.config.insert(key.into(), value);
        self
    }

    /// The node-type id this node resolves to.
    pub fn type_id(&self) -> &str {
        &self.data.type_id
    }

    /// Tool nodes advertise a tool schema and never execute in dataflow.
    pub fn is_tool_node(&self) -> bool {
        self.data.type_id.starts_with(TOOL_NODE_PREFIX)
    }
}

/// A directed edge between a source output port and a target input port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Defaults to the source's first output port when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Defaults to smart input mapping when absent. The value
    /// [`TOOLS_HANDLE`] marks a tool attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Creates a plain data edge with default handles.
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Sets the target handle.
    pub fn into_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    /// Sets the source handle.
    pub fn from_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// True when this edge attaches a tool provider rather than carrying data.
    pub fn is_tool_attachment(&self) -> bool {
        self.target_handle.as_deref() == Some(TOOLS_HANDLE)
    }
}

/// A complete workflow document. Immutable during one execution;
/// mutation happens by rebuilding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Creates an empty workflow document.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Appends a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Appends a plain data edge.
    pub fn with_edge(
        mut self,
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.edges.push(Edge::new(id, source, target));
        self
    }

    /// Appends a pre-built edge.
    pub fn with_edge_full(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Finds a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Finds the first node of the given node-type id.
    pub fn first_node_of_type(&self, type_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.type_id() == type_id)
    }

    /// Parses a workflow document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes this document to pretty JSON.
    pub fn to_json(&self) -> Result<String, WorkflowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that every edge endpoint resolves to a node in this document.
    pub fn validate_edges(&self) -> Result<(), WorkflowError> {
        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if self.node(endpoint).is_none() {
                    return Err(WorkflowError::UnresolvedEdge {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_round_trips_through_json() {
        let doc = Workflow::new("wf_1", "Round trip")
            .with_node(
                Node::new("text-1", "text-input", "Text")
                    .at(100.0, 200.0)
                    .with_config("text", json!("hello")),
            )
            .with_node(Node::new("debug-1", "debug", "Debug"))
            .with_edge_full(Edge::new("e1", "text-1", "debug-1").into_handle("input"));

        let json = doc.to_json().unwrap();
        let parsed = Workflow::from_json(&json).unwrap();

        assert_eq!(parsed.id, "wf_1");
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.nodes[0].display_type, "custom");
        assert_eq!(parsed.nodes[0].data.config["text"], json!("hello"));
        assert_eq!(parsed.edges[0].target_handle.as_deref(), Some("input"));
    }

    #[test]
    fn handles_use_camel_case_on_the_wire() {
        let edge = Edge::new("e1", "a", "b").into_handle(TOOLS_HANDLE);
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["targetHandle"], json!("tools"));
        assert!(json.get("target_handle").is_none());
    }

    #[test]
    fn tool_attachment_is_detected_by_handle() {
        let data = Edge::new("e1", "a", "b");
        let tool = Edge::new("e2", "a", "b").into_handle(TOOLS_HANDLE);
        assert!(!data.is_tool_attachment());
        assert!(tool.is_tool_attachment());
    }

    #[test]
    fn validate_edges_rejects_unknown_endpoints() {
        let doc = Workflow::new("wf_1", "Dangling").with_edge("e1", "a", "b");
        let err = doc.validate_edges().unwrap_err();
        assert!(matches!(err, WorkflowError::UnresolvedEdge { .. }));
    }
}
