//! The six builder tools the meta-workflow's orchestrator calls.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use weft_core::NullSink;
use weft_engine::extract_primary_result;
use weft_tools::{require_str, Tool, ToolError, ToolRegistry};

use crate::BuilderContext;

/// Registers the six builder tools against the given context.
pub fn register_builder_tools(tools: &ToolRegistry, ctx: Arc<BuilderContext>) {
    tools.register(ClearCanvasTool { ctx: Arc::clone(&ctx) });
    tools.register(AddNodeTool { ctx: Arc::clone(&ctx) });
    tools.register(ConnectNodesTool { ctx: Arc::clone(&ctx) });
    tools.register(ListNodesTool { ctx: Arc::clone(&ctx) });
    tools.register(SaveBuiltWorkflowTool { ctx: Arc::clone(&ctx) });
    tools.register(RunBuiltWorkflowTool { ctx });
}

struct ClearCanvasTool {
    ctx: Arc<BuilderContext>,
}

#[async_trait]
impl Tool for ClearCanvasTool {
    fn name(&self) -> &str {
        "clear_canvas"
    }

    fn description(&self) -> &str {
        "Clear the workflow canvas. Always call this first when building a new workflow."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        self.ctx.with_state(|state| state.reset());
        Ok(json!({ "success": true, "message": "Canvas cleared" }))
    }
}

struct AddNodeTool {
    ctx: Arc<BuilderContext>,
}

#[async_trait]
impl Tool for AddNodeTool {
    fn name(&self) -> &str {
        "add_node"
    }

    fn description(&self) -> &str {
        "Add a node to the canvas. Types: text-input, ai-chat, ai-transform, ai-orchestrator, debug, http-request, file-read, file-write, json-parse."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": { "type": "string", "description": "Node type id" },
                "label": { "type": "string", "description": "Display label" },
                "config_text": { "type": "string", "description": "For text-input: the text value" },
                "config_systemPrompt": { "type": "string", "description": "For ai-chat: the system prompt" },
                "config_tools": { "type": "string", "description": "For ai-orchestrator: comma-separated tool names" }
            },
            "required": ["type"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let type_id = require_str(&args, "type")?.to_string();
        let label = args
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&type_id)
            .to_string();

        let mut config = Map::new();
        for (arg_key, config_key) in [
            ("config_text", "text"),
            ("config_systemPrompt", "systemPrompt"),
            ("config_tools", "tools"),
        ] {
            if let Some(value) = args.get(arg_key).and_then(Value::as_str) {
                config.insert(config_key.to_string(), json!(value));
            }
        }

        let id = self
            .ctx
            .with_state(|state| state.add_node(&type_id, &label, config));
        info!("Builder: added {type_id} node {id}");
        Ok(json!({ "success": true, "node_id": id, "type": type_id, "label": label }))
    }
}

struct ConnectNodesTool {
    ctx: Arc<BuilderContext>,
}

#[async_trait]
impl Tool for ConnectNodesTool {
    fn name(&self) -> &str {
        "connect_nodes"
    }

    fn description(&self) -> &str {
        "Connect two nodes on the canvas, by node id or label."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from_node_id": { "type": "string", "description": "Source node id or label" },
                "to_node_id": { "type": "string", "description": "Target node id or label" }
            },
            "required": ["from_node_id", "to_node_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let from = require_str(&args, "from_node_id")?;
        let to = require_str(&args, "to_node_id")?;

        let edge_id = self
            .ctx
            .with_state(|state| state.connect(from, to))
            .map_err(ToolError::ExecutionFailed)?;

        Ok(json!({ "success": true, "edge_id": edge_id, "from": from, "to": to }))
    }
}

struct ListNodesTool {
    ctx: Arc<BuilderContext>,
}

#[async_trait]
impl Tool for ListNodesTool {
    fn name(&self) -> &str {
        "list_nodes"
    }

    fn description(&self) -> &str {
        "List the nodes and edges currently on the canvas."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(self.ctx.with_state(|state| {
            json!({
                "nodes": state
                    .nodes
                    .iter()
                    .map(|n| json!({ "id": n.id, "type": n.type_id(), "label": n.data.label }))
                    .collect::<Vec<_>>(),
                "edges": state
                    .edges
                    .iter()
                    .map(|e| json!({ "from": e.source, "to": e.target }))
                    .collect::<Vec<_>>(),
            })
        }))
    }
}

struct SaveBuiltWorkflowTool {
    ctx: Arc<BuilderContext>,
}

#[async_trait]
impl Tool for SaveBuiltWorkflowTool {
    fn name(&self) -> &str {
        "save_built_workflow"
    }

    fn description(&self) -> &str {
        "Save the canvas as a named workflow."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Workflow name" },
                "description": { "type": "string", "description": "Optional description" }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let name = require_str(&args, "name")?;
        let description = args.get("description").and_then(Value::as_str);

        let (nodes, edges) = self
            .ctx
            .with_state(|state| (state.nodes.clone(), state.edges.clone()));
        if nodes.is_empty() {
            return Err(ToolError::ExecutionFailed("no nodes to save".into()));
        }

        let saved = self
            .ctx
            .store
            .save(name, nodes, edges, description, None)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(json!({
            "success": true,
            "workflow_id": saved.id,
            "name": saved.name,
            "node_count": saved.nodes.len(),
        }))
    }
}

struct RunBuiltWorkflowTool {
    ctx: Arc<BuilderContext>,
}

#[async_trait]
impl Tool for RunBuiltWorkflowTool {
    fn name(&self) -> &str {
        "run_built_workflow"
    }

    fn description(&self) -> &str {
        "Execute the workflow currently on the canvas and return its result."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        let doc = self
            .ctx
            .with_state(|state| {
                if state.nodes.is_empty() {
                    None
                } else {
                    Some(state.to_workflow("builder-preview", "Builder Preview"))
                }
            })
            .ok_or_else(|| ToolError::ExecutionFailed("no nodes to run".into()))?;

        let result = self.ctx.engine.execute(&doc, Arc::new(NullSink)).await;
        if !result.success {
            return Err(ToolError::ExecutionFailed(
                result.error.unwrap_or_else(|| "execution failed".into()),
            ));
        }

        let summary = extract_primary_result(&doc, &result.outputs)
            .unwrap_or_else(|| "Workflow completed".to_string());
        Ok(json!({ "success": true, "result": summary }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use weft_engine::Engine;
    use weft_llm::ScriptedLlm;
    use weft_nodes::{install_builtins, install_orchestrator_node, NodeRegistry};
    use weft_store::WorkflowStore;

    fn context() -> (tempfile::TempDir, Arc<BuilderContext>, Arc<ToolRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WorkflowStore::new(dir.path()).unwrap());
        let nodes = Arc::new(NodeRegistry::new());
        install_builtins(&nodes);
        install_orchestrator_node(&nodes);
        let tools = Arc::new(ToolRegistry::new());
        let engine = Arc::new(Engine::new(
            nodes,
            Arc::clone(&tools),
            Arc::new(ScriptedLlm::new()),
        ));
        let ctx = BuilderContext::new(engine, store);
        register_builder_tools(&tools, Arc::clone(&ctx));
        (dir, ctx, tools)
    }

    async fn call(tools: &ToolRegistry, name: &str, args: Value) -> Result<Value, ToolError> {
        tools.get(name).unwrap().execute(args).await
    }

    #[tokio::test]
    async fn build_save_load_round_trip() {
        let (_dir, ctx, tools) = context();

        call(&tools, "clear_canvas", json!({})).await.unwrap();
        call(
            &tools,
            "add_node",
            json!({ "type": "text-input", "label": "A", "config_text": "hello" }),
        )
        .await
        .unwrap();
        call(&tools, "add_node", json!({ "type": "debug", "label": "B" }))
            .await
            .unwrap();
        call(
            &tools,
            "connect_nodes",
            json!({ "from_node_id": "A", "to_node_id": "B" }),
        )
        .await
        .unwrap();

        let saved = call(&tools, "save_built_workflow", json!({ "name": "S" }))
            .await
            .unwrap();
        let id = saved["workflow_id"].as_str().unwrap();

        let loaded = ctx.store.get(id).unwrap().unwrap();
        assert_eq!(loaded.nodes.len(), 2);
        assert_eq!(loaded.edges.len(), 1);
        assert_eq!(loaded.edges[0].source, "node_1");
        assert_eq!(loaded.edges[0].target, "node_2");
        assert_eq!(loaded.nodes[0].data.config["text"], json!("hello"));
    }

    #[tokio::test]
    async fn connect_reports_missing_endpoints() {
        let (_dir, _ctx, tools) = context();
        call(&tools, "clear_canvas", json!({})).await.unwrap();

        let err = call(
            &tools,
            "connect_nodes",
            json!({ "from_node_id": "nope", "to_node_id": "also-nope" }),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("source not found: nope"));
    }

    #[tokio::test]
    async fn save_requires_nodes() {
        let (_dir, _ctx, tools) = context();
        call(&tools, "clear_canvas", json!({})).await.unwrap();

        let err = call(&tools, "save_built_workflow", json!({ "name": "Empty" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no nodes"));
    }

    #[tokio::test]
    async fn run_built_workflow_executes_the_canvas() {
        let (_dir, _ctx, tools) = context();
        call(&tools, "clear_canvas", json!({})).await.unwrap();
        call(
            &tools,
            "add_node",
            json!({ "type": "text-input", "config_text": "ping" }),
        )
        .await
        .unwrap();
        call(&tools, "add_node", json!({ "type": "debug" })).await.unwrap();
        call(
            &tools,
            "connect_nodes",
            json!({ "from_node_id": "node_1", "to_node_id": "node_2" }),
        )
        .await
        .unwrap();

        let result = call(&tools, "run_built_workflow", json!({})).await.unwrap();
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["result"], json!("ping"));
    }

    #[tokio::test]
    async fn list_nodes_reflects_the_canvas() {
        let (_dir, _ctx, tools) = context();
        call(&tools, "clear_canvas", json!({})).await.unwrap();
        call(&tools, "add_node", json!({ "type": "debug", "label": "Only" }))
            .await
            .unwrap();

        let listing = call(&tools, "list_nodes", json!({})).await.unwrap();
        assert_eq!(listing["nodes"][0]["label"], json!("Only"));
        assert!(listing["edges"].as_array().unwrap().is_empty());
    }
}
