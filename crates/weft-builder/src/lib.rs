//! The workflow builder: a canvas state mutated by six tools, driven
//! by the builder meta-workflow's orchestrator, plus the adapter that
//! exposes saved workflows as callable tools.
//!
//! - [`BuilderState`] — the canvas being assembled
//! - [`BuilderContext`] — state + engine + store, constructed once at
//!   startup and shared by reference (no hidden globals)
//! - [`register_builder_tools`] — installs the six builder tools
//! - [`register_workflow_tools`] — wraps each saved workflow as a tool

mod tools;
mod workflow_tool;

pub use tools::register_builder_tools;
pub use workflow_tool::{register_workflow_tools, sanitize_tool_name, MAX_TOOL_DEPTH};

use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use weft_core::{Edge, Node, Workflow};
use weft_engine::Engine;
use weft_store::WorkflowStore;

/// The canvas the builder tools mutate: nodes, edges, and the next
/// node-id sequence number.
#[derive(Debug, Default)]
pub struct BuilderState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub next_node_id: usize,
}

impl BuilderState {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_node_id: 1,
        }
    }

    /// Clears the canvas and restarts the id sequence.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.next_node_id = 1;
    }

    /// Appends a node, assigning `node_<seq>` and the next canvas slot.
    pub fn add_node(
        &mut self,
        type_id: &str,
        label: &str,
        config: Map<String, Value>,
    ) -> String {
        let id = format!("node_{}", self.next_node_id);
        self.next_node_id += 1;

        let index = self.nodes.len() as f64;
        let mut node = Node::new(&id, type_id, label).at(150.0 + 250.0 * index, 200.0);
        node.data.config = config;
        self.nodes.push(node);
        id
    }

    /// Resolves a node reference: exact id first, then case-insensitive
    /// label.
    pub fn resolve(&self, reference: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == reference).or_else(|| {
            let lowered = reference.to_lowercase();
            self.nodes
                .iter()
                .find(|n| n.data.label.to_lowercase() == lowered)
        })
    }

    /// Connects two nodes (resolved by id or label). Errors name the
    /// missing endpoint.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<String, String> {
        let source = self
            .resolve(from)
            .map(|n| n.id.clone())
            .ok_or_else(|| format!("source not found: {from}"))?;
        let target = self
            .resolve(to)
            .map(|n| n.id.clone())
            .ok_or_else(|| format!("target not found: {to}"))?;

        let id = format!("edge_{}", self.edges.len() + 1);
        self.edges.push(Edge::new(&id, source, target));
        Ok(id)
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

    /// A JSON snapshot of the canvas (for build results and listings).
    pub fn snapshot(&self) -> Value {
        json!({
            "nodes": self.nodes,
            "edges": self.edges,
        })
    }
}

/// Everything the builder tools operate on. One instance per process,
/// created at startup and shared via `Arc`.
pub struct BuilderContext {
    pub state: Mutex<BuilderState>,
    pub engine: Arc<Engine>,
    pub store: Arc<WorkflowStore>,
}

impl BuilderContext {
    pub fn new(engine: Arc<Engine>, store: Arc<WorkflowStore>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BuilderState::new()),
            engine,
            store,
        })
    }

    /// Runs a closure against the locked builder state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BuilderState) -> R) -> R {
        let mut state = self.state.lock().expect("builder state lock");
        f(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_and_positions_follow_the_sequence() {
        let mut state = BuilderState::new();
        let a = state.add_node("text-input", "Input", Map::new());
        let b = state.add_node("debug", "Out", Map::new());

        assert_eq!(a, "node_1");
        assert_eq!(b, "node_2");
        assert_eq!(state.nodes[0].position.x, 150.0);
        assert_eq!(state.nodes[1].position.x, 400.0);
        assert_eq!(state.nodes[1].position.y, 200.0);
    }

    #[test]
    fn connect_resolves_by_id_then_label() {
        let mut state = BuilderState::new();
        state.add_node("text-input", "My Input", Map::new());
        state.add_node("debug", "My Output", Map::new());

        state.connect("node_1", "my output").unwrap();
        assert_eq!(state.edges[0].source, "node_1");
        assert_eq!(state.edges[0].target, "node_2");

        let err = state.connect("ghost", "node_2").unwrap_err();
        assert_eq!(err, "source not found: ghost");
        let err = state.connect("node_1", "ghost").unwrap_err();
        assert_eq!(err, "target not found: ghost");
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut state = BuilderState::new();
        state.add_node("debug", "A", Map::new());
        state.reset();
        assert!(state.nodes.is_empty());
        assert_eq!(state.add_node("debug", "B", Map::new()), "node_1");
    }
}
