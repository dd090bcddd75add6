//! Saved workflows as callable tools.
//!
//! Every saved workflow is wrapped as a tool named
//! `workflow_<sanitized id>` and advertised as a tool node, so an
//! orchestrator can run other workflows. Workflows calling workflows
//! can recurse; a shared depth counter bounds the nesting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use weft_core::{NodeCategory, NullSink, ToolSchema, TOOL_NODE_PREFIX};
use weft_engine::{extract_primary_result, Engine};
use weft_nodes::{NodeRegistry, NodeTypeDefinition};
use weft_store::WorkflowStore;
use weft_tools::{Tool, ToolError, ToolRegistry};

/// Upper bound on nested workflow-tool runs, preventing infinite
/// mutual recursion between workflows that call each other.
pub const MAX_TOOL_DEPTH: usize = 8;

/// Lowercases and replaces every non-alphanumeric character with `_`.
pub fn sanitize_tool_name(id: &str) -> String {
    id.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Releases one recursion slot on drop, whatever the exit path.
struct DepthGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A saved workflow exposed as a callable tool. The workflow document
/// is re-read from the store on every call so edits take effect
/// immediately.
pub struct WorkflowTool {
    tool_name: String,
    workflow_id: String,
    description: String,
    engine: Arc<Engine>,
    store: Arc<WorkflowStore>,
    depth: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for WorkflowTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "Text injected into the workflow's first text-input node"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let previous = self.depth.fetch_add(1, Ordering::SeqCst);
        let _guard = DepthGuard {
            depth: Arc::clone(&self.depth),
        };
        if previous >= MAX_TOOL_DEPTH {
            warn!("Workflow tool '{}' hit the recursion bound", self.tool_name);
            return Err(ToolError::ExecutionFailed(format!(
                "workflow tool recursion depth {MAX_TOOL_DEPTH} exceeded"
            )));
        }

        let saved = self
            .store
            .get(&self.workflow_id)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?
            .ok_or_else(|| ToolError::NotFound(self.workflow_id.clone()))?;

        let mut doc = saved.to_workflow();
        if let Some(task) = args.get("task").and_then(Value::as_str) {
            if let Some(node) = doc.nodes.iter_mut().find(|n| n.type_id() == "text-input") {
                node.data.config.insert("text".into(), json!(task));
            }
        }

        info!("Running workflow '{}' as tool", doc.name);
        let result = self.engine.execute(&doc, Arc::new(NullSink)).await;
        if !result.success {
            return Err(ToolError::ExecutionFailed(
                result.error.unwrap_or_else(|| "execution failed".into()),
            ));
        }

        let summary = extract_primary_result(&doc, &result.outputs)
            .unwrap_or_else(|| "Workflow completed".to_string());
        Ok(json!({ "result": summary }))
    }
}

/// Wraps every workflow currently in the store as a tool and a tool
/// node. Re-running refreshes the registrations (idempotent per name).
pub fn register_workflow_tools(
    store: &Arc<WorkflowStore>,
    engine: &Arc<Engine>,
    tools: &ToolRegistry,
    nodes: &NodeRegistry,
) -> usize {
    let depth = Arc::new(AtomicUsize::new(0));
    let mut count = 0;

    for saved in store.list() {
        let tool_name = format!("workflow_{}", sanitize_tool_name(&saved.id));
        let description = if saved.description.is_empty() {
            format!("Run the saved workflow '{}'", saved.name)
        } else {
            format!("Run the saved workflow '{}': {}", saved.name, saved.description)
        };

        let tool = WorkflowTool {
            tool_name: tool_name.clone(),
            workflow_id: saved.id.clone(),
            description: description.clone(),
            engine: Arc::clone(engine),
            store: Arc::clone(store),
            depth: Arc::clone(&depth),
        };
        let schema = ToolSchema::new(tool_name.clone(), description, tool.parameters());
        tools.register(tool);

        nodes.register(
            NodeTypeDefinition::new(
                format!("{TOOL_NODE_PREFIX}{tool_name}"),
                saved.name.clone(),
                NodeCategory::Tool,
            )
            .with_tool_schema(schema),
        );
        count += 1;
    }

    info!("Registered {count} workflow tools");
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use weft_core::{Edge, Node, Workflow};
    use weft_llm::ScriptedLlm;
    use weft_nodes::install_builtins;

    fn stack() -> (
        tempfile::TempDir,
        Arc<WorkflowStore>,
        Arc<Engine>,
        Arc<ToolRegistry>,
        Arc<NodeRegistry>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WorkflowStore::new(dir.path()).unwrap());
        let nodes = Arc::new(NodeRegistry::new());
        install_builtins(&nodes);
        let tools = Arc::new(ToolRegistry::new());
        let engine = Arc::new(Engine::new(
            Arc::clone(&nodes),
            Arc::clone(&tools),
            Arc::new(ScriptedLlm::new()),
        ));
        (dir, store, engine, tools, nodes)
    }

    fn echo_workflow() -> Workflow {
        Workflow::new("ignored", "Echo")
            .with_node(Node::new("t", "text-input", "T").with_config("text", json!("default")))
            .with_node(Node::new("d", "debug", "D"))
            .with_edge_full(Edge::new("e", "t", "d"))
    }

    #[test]
    fn sanitizes_ids_for_tool_names() {
        assert_eq!(sanitize_tool_name("wf_123_Ab-c.d"), "wf_123_ab_c_d");
    }

    #[tokio::test]
    async fn saved_workflow_runs_as_a_tool_with_task_injection() {
        let (_dir, store, engine, tools, nodes) = stack();
        let doc = echo_workflow();
        let saved = store
            .save(&doc.name, doc.nodes, doc.edges, None, None)
            .unwrap();

        register_workflow_tools(&store, &engine, &tools, &nodes);

        let tool_name = format!("workflow_{}", sanitize_tool_name(&saved.id));
        let tool = tools.get(&tool_name).expect("workflow tool registered");

        let result = tool.execute(json!({ "task": "injected" })).await.unwrap();
        assert_eq!(result["result"], json!("injected"));

        // The matching tool node advertises the same schema name.
        let node = nodes.get(&format!("tool-{tool_name}")).unwrap();
        assert_eq!(node.tool_schema.as_ref().unwrap().name, tool_name);
    }

    #[tokio::test]
    async fn missing_workflow_is_a_not_found_error() {
        let (_dir, store, engine, tools, nodes) = stack();
        let doc = echo_workflow();
        let saved = store
            .save(&doc.name, doc.nodes, doc.edges, None, None)
            .unwrap();
        register_workflow_tools(&store, &engine, &tools, &nodes);

        store.delete(&saved.id).unwrap();

        let tool_name = format!("workflow_{}", sanitize_tool_name(&saved.id));
        let err = tools
            .get(&tool_name)
            .unwrap()
            .execute(json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
