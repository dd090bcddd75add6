//! Built-in workflow templates and first-run store seeding.

use std::fs;
use std::path::Path;

use serde_json::json;
use tracing::{info, warn};

use weft_core::{Edge, Node, Workflow, TOOLS_HANDLE};

use crate::{StoreError, WorkflowStore};

/// Registry of reusable workflow templates: the built-in set plus any
/// JSON documents loaded from a templates directory.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: Vec<Workflow>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in templates.
    pub fn with_builtins() -> Self {
        Self {
            templates: vec![simple_chat_template(), calculator_agent_template()],
        }
    }

    /// Adds or replaces a template by id.
    pub fn register(&mut self, template: Workflow) {
        if let Some(existing) = self.templates.iter_mut().find(|t| t.id == template.id) {
            *existing = template;
        } else {
            self.templates.push(template);
        }
    }

    /// Loads every `.json` workflow document from a directory.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<usize, StoreError> {
        let entries =
            fs::read_dir(dir).map_err(|e| StoreError::io(dir.display().to_string(), e))?;

        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let content = fs::read_to_string(&path)
                .map_err(|e| StoreError::io(path.display().to_string(), e))?;
            match Workflow::from_json(&content) {
                Ok(template) => {
                    self.register(template);
                    loaded += 1;
                }
                Err(e) => warn!("Skipping template {}: {e}", path.display()),
            }
        }
        info!("Loaded {loaded} workflow templates from {}", dir.display());
        Ok(loaded)
    }

    /// Gets a template by id.
    pub fn get(&self, id: &str) -> Option<&Workflow> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// All templates, in registration order.
    pub fn list(&self) -> &[Workflow] {
        &self.templates
    }

    /// `(id, name)` pairs for prompt and API listings.
    pub fn summaries(&self) -> Vec<(String, String)> {
        self.templates
            .iter()
            .map(|t| (t.id.clone(), t.name.clone()))
            .collect()
    }
}

/// Simple question-answering chain: text in, one model call, debug out.
fn simple_chat_template() -> Workflow {
    Workflow::new("simple-chat", "Simple Chat")
        .with_node(
            Node::new("text-1", "text-input", "Question")
                .at(150.0, 200.0)
                .with_config("text", json!("What is the capital of France?")),
        )
        .with_node(
            Node::new("chat-1", "ai-chat", "Answer")
                .at(400.0, 200.0)
                .with_config("systemPrompt", json!("You are a concise assistant.")),
        )
        .with_node(Node::new("debug-1", "debug", "Result").at(650.0, 200.0))
        .with_edge("e1", "text-1", "chat-1")
        .with_edge("e2", "chat-1", "debug-1")
}

/// An agent wired to the calculator and datetime tools.
fn calculator_agent_template() -> Workflow {
    Workflow::new("calculator-agent", "Calculator Agent")
        .with_node(
            Node::new("text-1", "text-input", "Task")
                .at(150.0, 200.0)
                .with_config("text", json!("What is 17 * 23, and what day is it today?")),
        )
        .with_node(
            Node::new("orch-1", "ai-orchestrator", "Agent")
                .at(400.0, 200.0)
                .with_config("maxSteps", json!(6)),
        )
        .with_node(Node::new("calc-1", "tool-calculator", "Calculator").at(400.0, 420.0))
        .with_node(Node::new("time-1", "tool-datetime", "Datetime").at(620.0, 420.0))
        .with_node(Node::new("debug-1", "debug", "Result").at(650.0, 200.0))
        .with_edge("e1", "text-1", "orch-1")
        .with_edge_full(Edge::new("e2", "calc-1", "orch-1").into_handle(TOOLS_HANDLE))
        .with_edge_full(Edge::new("e3", "time-1", "orch-1").into_handle(TOOLS_HANDLE))
        .with_edge_full(Edge::new("e4", "orch-1", "debug-1").from_handle("result"))
}

/// Name given to the seeded meta-workflow. The chat dispatcher locates
/// it by the "workflow builder" substring.
pub const BUILDER_WORKFLOW_NAME: &str = "Workflow Builder";

const BUILDER_TOOLS: [&str; 6] = [
    "clear_canvas",
    "add_node",
    "connect_nodes",
    "list_nodes",
    "save_built_workflow",
    "run_built_workflow",
];

/// The meta-workflow the chat dispatcher runs on build requests: a
/// text-input holding the instrumented build prompt, feeding an
/// orchestrator with the six builder tools attached.
pub fn builder_workflow() -> Workflow {
    let mut doc = Workflow::new("workflow-builder", BUILDER_WORKFLOW_NAME)
        .with_node(
            Node::new("instructions", "text-input", "Build Instructions")
                .at(150.0, 200.0)
                .with_config("text", json!("")),
        )
        .with_node(
            Node::new("builder", "ai-orchestrator", "Builder Agent")
                .at(400.0, 200.0)
                .with_config("maxSteps", json!(12))
                .with_config(
                    "systemPrompt",
                    json!("You are a workflow builder. Follow the build steps exactly, one tool call per turn."),
                ),
        )
        .with_edge("e-task", "instructions", "builder");

    for (index, tool) in BUILDER_TOOLS.iter().enumerate() {
        let node_id = format!("tool-{index}");
        doc = doc
            .with_node(
                Node::new(&node_id, format!("tool-{tool}"), *tool)
                    .at(150.0 + 160.0 * index as f64, 420.0),
            )
            .with_edge_full(
                Edge::new(format!("e-tool-{index}"), node_id, "builder").into_handle(TOOLS_HANDLE),
            );
    }

    doc
}

/// Seeds an empty store with the builder meta-workflow and the
/// built-in examples; on a non-empty store, only installs the builder
/// workflow when none is present.
pub fn seed_store(store: &WorkflowStore) -> Result<(), StoreError> {
    let existing = store.list();

    let has_builder = existing
        .iter()
        .any(|w| w.name.to_lowercase().contains("workflow builder"));
    if !has_builder {
        let doc = builder_workflow();
        store.save(&doc.name, doc.nodes, doc.edges, Some("Meta-workflow that builds new workflows from chat requests"), None)?;
        info!("Seeded builder workflow");
    }

    if existing.is_empty() {
        let doc = simple_chat_template();
        store.save(
            &doc.name,
            doc.nodes,
            doc.edges,
            Some("Example: question to answer to debug output"),
            None,
        )?;
        info!("Seeded example workflows");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_by_id() {
        let registry = TemplateRegistry::with_builtins();
        assert!(registry.get("simple-chat").is_some());
        assert!(registry.get("calculator-agent").is_some());
        assert!(registry.get("nope").is_none());
        assert_eq!(registry.summaries().len(), 2);
    }

    #[test]
    fn builder_workflow_wires_all_six_tools() {
        let doc = builder_workflow();
        let attachments: Vec<&Edge> = doc
            .edges
            .iter()
            .filter(|e| e.is_tool_attachment())
            .collect();
        assert_eq!(attachments.len(), 6);
        assert!(attachments.iter().all(|e| e.target == "builder"));
        assert!(doc.first_node_of_type("text-input").is_some());
        doc.validate_edges().unwrap();
    }

    #[test]
    fn seeding_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkflowStore::new(dir.path()).unwrap();

        seed_store(&store).unwrap();
        let first_count = store.list().len();
        assert!(first_count >= 2);

        seed_store(&store).unwrap();
        assert_eq!(store.list().len(), first_count);

        let builder = store
            .list()
            .into_iter()
            .find(|w| w.name.to_lowercase().contains("workflow builder"))
            .unwrap();
        assert_eq!(builder.nodes.len(), 8);
    }
}
