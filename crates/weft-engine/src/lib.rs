//! The workflow execution engine.
//!
//! [`Engine::execute`] takes a workflow document and a progress sink,
//! topologically orders the executable nodes, resolves each node's
//! inputs from its incoming data edges, invokes the node executors in
//! sequence, and collects per-node outputs:
//!
//! 1. Nodes whose type id begins with `tool-` never execute; edges with
//!    `targetHandle == "tools"` attach them to an orchestrator instead
//!    of carrying data.
//! 2. Scheduling is strictly sequential over Kahn's order; independent
//!    nodes are never run concurrently.
//! 3. A node executor failure aborts the whole execution; an unknown
//!    node type is logged and skipped.
//!
//! [`extract_primary_result`] condenses a finished run to the one
//! string callers surface (chat replies, workflow-as-tool results).

mod sort;

pub use sort::CycleError;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use weft_core::{
    Edge, Node, NodeStatus, PortMap, ProgressEvent, ProgressSink, Workflow,
};
use weft_llm::Llm;
use weft_nodes::{
    ExecutionContext, NodeRegistry, NodeTypeDefinition, CONNECTED_TOOLS_KEY, NODE_ID_KEY,
    TOOL_NODE_MAP_KEY,
};
use weft_tools::ToolRegistry;

/// Outcome of one workflow execution.
#[derive(Debug)]
pub struct ExecutionResult {
    pub success: bool,
    /// Per-node output maps, one entry per node that ran.
    pub outputs: HashMap<String, PortMap>,
    /// The run's log, each line prefixed `HH:MM:SS`.
    pub logs: Vec<String>,
    pub error: Option<String>,
}

/// Executes workflow documents against the node and tool registries.
pub struct Engine {
    nodes: Arc<NodeRegistry>,
    tools: Arc<ToolRegistry>,
    llm: Arc<dyn Llm>,
}

impl Engine {
    pub fn new(nodes: Arc<NodeRegistry>, tools: Arc<ToolRegistry>, llm: Arc<dyn Llm>) -> Self {
        Self { nodes, tools, llm }
    }

    /// The node registry this engine resolves types against.
    pub fn node_registry(&self) -> &Arc<NodeRegistry> {
        &self.nodes
    }

    /// The tool registry carried into execution contexts.
    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Executes the document, emitting progress events to the sink.
    pub async fn execute(&self, doc: &Workflow, sink: Arc<dyn ProgressSink>) -> ExecutionResult {
        let ctx = ExecutionContext::new(
            doc.id.clone(),
            Arc::clone(&self.llm),
            Arc::clone(&self.tools),
            sink,
        );

        ctx.emit(ProgressEvent::ExecutionStart {
            workflow_id: doc.id.clone(),
        });
        ctx.log(format!(
            "Executing workflow '{}' ({} nodes, {} edges)",
            doc.name,
            doc.nodes.len(),
            doc.edges.len()
        ));

        let executable: Vec<&Node> = doc.nodes.iter().filter(|n| !n.is_tool_node()).collect();
        let data_edges: Vec<&Edge> = doc.edges.iter().filter(|e| !e.is_tool_attachment()).collect();

        let order = match sort::topological_order(&executable, &data_edges) {
            Ok(order) => order,
            Err(_) => {
                let msg = "cycle detected".to_string();
                ctx.log(&msg);
                ctx.emit(ProgressEvent::ExecutionComplete {
                    workflow_id: doc.id.clone(),
                    success: false,
                    error: Some(msg.clone()),
                });
                return ExecutionResult {
                    success: false,
                    outputs: HashMap::new(),
                    logs: ctx.logs(),
                    error: Some(msg),
                };
            }
        };

        let mut outputs: HashMap<String, PortMap> = HashMap::new();

        for node_id in &order {
            let node = doc.node(node_id).expect("ordered node exists");

            let Some(def) = self.nodes.get(node.type_id()) else {
                warn!("Unknown node type '{}'", node.type_id());
                ctx.log(format!(
                    "Unknown node type '{}', skipping node '{}'",
                    node.type_id(),
                    node.id
                ));
                continue;
            };

            // Plugin tool nodes carry no `tool-` prefix but still have
            // no executor; they only provide schemas.
            if !def.is_executable() {
                ctx.log(format!(
                    "Node '{}' ({}) is a tool provider, skipping",
                    node.id, def.id
                ));
                continue;
            }

            ctx.send_progress(&node.id, NodeStatus::Running, None);
            ctx.log(format!("→ {} ({})", node.data.label, def.id));

            let inputs = self.collect_inputs(doc, node, &def, &outputs);
            let config = self.build_config(doc, node);

            match def.execute(&inputs, &config, &ctx).await {
                Ok(node_outputs) => {
                    ctx.send_progress(
                        &node.id,
                        NodeStatus::Complete,
                        Some(Value::Object(node_outputs.clone())),
                    );
                    outputs.insert(node.id.clone(), node_outputs);
                }
                Err(e) => {
                    let msg = format!("node '{}' failed: {e}", node.id);
                    ctx.send_progress(
                        &node.id,
                        NodeStatus::Error,
                        Some(json!({ "error": e.to_string() })),
                    );
                    ctx.log(&msg);
                    ctx.emit(ProgressEvent::ExecutionComplete {
                        workflow_id: doc.id.clone(),
                        success: false,
                        error: Some(msg.clone()),
                    });
                    return ExecutionResult {
                        success: false,
                        outputs,
                        logs: ctx.logs(),
                        error: Some(msg),
                    };
                }
            }
        }

        ctx.log("Workflow complete");
        ctx.emit(ProgressEvent::ExecutionComplete {
            workflow_id: doc.id.clone(),
            success: true,
            error: None,
        });

        ExecutionResult {
            success: true,
            outputs,
            logs: ctx.logs(),
            error: None,
        }
    }

    /// Resolves a node's inputs from its incoming data edges, in
    /// document order. The first edge to claim a port wins; later
    /// edges to the same port are ignored. Each bound value also
    /// populates the `input`/`prompt`/`text` aliases when unset.
    fn collect_inputs(
        &self,
        doc: &Workflow,
        node: &Node,
        def: &NodeTypeDefinition,
        outputs: &HashMap<String, PortMap>,
    ) -> PortMap {
        let mut inputs = PortMap::new();

        for edge in doc
            .edges
            .iter()
            .filter(|e| e.target == node.id && !e.is_tool_attachment())
        {
            let Some(source_outputs) = outputs.get(&edge.source) else {
                // Skipped or never-executed source; downstream sees the
                // port as absent.
                continue;
            };

            let source_key = match &edge.source_handle {
                Some(handle) => handle.clone(),
                None => {
                    let declared = doc
                        .node(&edge.source)
                        .and_then(|source| self.nodes.get(source.type_id()))
                        .and_then(|d| d.first_output().map(String::from));
                    match declared.or_else(|| source_outputs.keys().next().cloned()) {
                        Some(key) => key,
                        None => continue,
                    }
                }
            };

            let Some(value) = source_outputs.get(&source_key) else {
                debug!(
                    "edge '{}': source '{}' produced no '{}' output",
                    edge.id, edge.source, source_key
                );
                continue;
            };

            let port = match &edge.target_handle {
                Some(handle) => handle.clone(),
                None => smart_target_port(def, &source_key),
            };

            if !inputs.contains_key(&port) {
                inputs.insert(port, value.clone());
            }
            for alias in ["input", "prompt", "text"] {
                if !inputs.contains_key(alias) {
                    inputs.insert(alias.to_string(), value.clone());
                }
            }
        }

        inputs
    }

    /// Clones the node's config and injects the engine's reserved keys:
    /// the node id, and for orchestrators the schemas of attached tools.
    fn build_config(&self, doc: &Workflow, node: &Node) -> PortMap {
        let mut config = node.data.config.clone();
        config.insert(NODE_ID_KEY.to_string(), json!(node.id));

        if node.type_id() == "ai-orchestrator" {
            let (schemas, tool_node_map) = self.discover_attached_tools(doc, node);
            config.insert(CONNECTED_TOOLS_KEY.to_string(), Value::Array(schemas));
            config.insert(TOOL_NODE_MAP_KEY.to_string(), Value::Object(tool_node_map));
        }

        config
    }

    /// Walks the tool-attachment edges into an orchestrator and
    /// collects the schemas of the attached tool nodes.
    fn discover_attached_tools(
        &self,
        doc: &Workflow,
        node: &Node,
    ) -> (Vec<Value>, Map<String, Value>) {
        let mut schemas = Vec::new();
        let mut tool_node_map = Map::new();

        for edge in doc
            .edges
            .iter()
            .filter(|e| e.target == node.id && e.is_tool_attachment())
        {
            let Some(source) = doc.node(&edge.source) else { continue };
            let Some(def) = self.nodes.get(source.type_id()) else {
                continue;
            };
            let Some(schema) = &def.tool_schema else {
                debug!(
                    "tool attachment '{}' from non-tool node '{}'",
                    edge.id, source.id
                );
                continue;
            };
            tool_node_map.insert(schema.name.clone(), json!(source.id));
            if let Ok(value) = serde_json::to_value(schema) {
                schemas.push(value);
            }
        }

        (schemas, tool_node_map)
    }
}

/// Maps a source output key onto the target's declared input ports:
/// `content` for response-like keys, then a generic `input` port, then
/// `prompt` for text-like keys, then the first declared input.
fn smart_target_port(def: &NodeTypeDefinition, source_key: &str) -> String {
    if def.has_input("content") && matches!(source_key, "response" | "output" | "text") {
        "content".to_string()
    } else if def.has_input("input") {
        "input".to_string()
    } else if def.has_input("prompt") && matches!(source_key, "text" | "output") {
        "prompt".to_string()
    } else {
        def.first_input().unwrap_or("input").to_string()
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Condenses a finished execution to its primary result string, by
/// node-type priority:
///
/// 1. an `ai-orchestrator` with a `result` or `memory.final_result`
/// 2. an `ai-chat`/`ai-transform` with a `response` or `output`
/// 3. a `debug` node holding a non-empty object (JSON-stringified)
/// 4. the last non-empty output of any node that is not a
///    `trigger`/`text-input`
///
/// Returns `None` when nothing qualifies; callers supply their own
/// fallback wording.
pub fn extract_primary_result(
    doc: &Workflow,
    outputs: &HashMap<String, PortMap>,
) -> Option<String> {
    for node in doc.nodes.iter().filter(|n| n.type_id() == "ai-orchestrator") {
        let Some(out) = outputs.get(&node.id) else { continue };
        if let Some(result) = out.get("result").and_then(non_empty_str) {
            return Some(result);
        }
        if let Some(result) = out
            .get("memory")
            .and_then(|m| m.get("final_result"))
            .and_then(non_empty_str)
        {
            return Some(result);
        }
    }

    for node in doc
        .nodes
        .iter()
        .filter(|n| matches!(n.type_id(), "ai-chat" | "ai-transform"))
    {
        let Some(out) = outputs.get(&node.id) else { continue };
        if let Some(value) = out.get("response").or_else(|| out.get("output")) {
            let rendered = render_value(value);
            if !rendered.is_empty() {
                return Some(rendered);
            }
        }
    }

    for node in doc.nodes.iter().filter(|n| n.type_id() == "debug") {
        let Some(out) = outputs.get(&node.id) else { continue };
        if let Some(Value::Object(map)) = out.get("output") {
            if !map.is_empty() {
                return Some(Value::Object(map.clone()).to_string());
            }
        }
    }

    let mut last: Option<String> = None;
    for node in doc
        .nodes
        .iter()
        .filter(|n| !matches!(n.type_id(), "trigger" | "text-input"))
    {
        let Some(out) = outputs.get(&node.id) else { continue };
        if out.is_empty() {
            continue;
        }
        last = Some(if out.len() == 1 {
            render_value(out.values().next().expect("non-empty map"))
        } else {
            Value::Object(out.clone()).to_string()
        });
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use weft_core::{NullSink, Port, TOOLS_HANDLE};
    use weft_llm::ScriptedLlm;
    use weft_nodes::{
        install_builtins, install_orchestrator_node, install_tool_nodes, NodeError, NodeExecutor,
    };

    fn engine_with(llm: ScriptedLlm) -> Engine {
        let nodes = Arc::new(NodeRegistry::new());
        install_builtins(&nodes);
        install_orchestrator_node(&nodes);
        let tools = Arc::new(ToolRegistry::with_defaults());
        install_tool_nodes(&nodes, &tools);
        Engine::new(nodes, tools, Arc::new(llm))
    }

    /// Records the inputs it was called with, for mapping assertions.
    struct CaptureNode {
        seen: Arc<Mutex<Vec<PortMap>>>,
    }

    #[async_trait]
    impl NodeExecutor for CaptureNode {
        async fn execute(
            &self,
            inputs: &PortMap,
            _config: &PortMap,
            _ctx: &ExecutionContext,
        ) -> Result<PortMap, NodeError> {
            self.seen.lock().unwrap().push(inputs.clone());
            Ok(PortMap::new())
        }
    }

    /// Collects progress events for ordering assertions.
    struct RecordingSink {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }
        fn running_order(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    ProgressEvent::NodeProgress {
                        node_id,
                        status: NodeStatus::Running,
                        ..
                    } => Some(node_id.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn empty_document_succeeds_with_no_outputs() {
        let engine = engine_with(ScriptedLlm::new());
        let doc = Workflow::new("wf_empty", "Empty");

        let result = engine.execute(&doc, Arc::new(NullSink)).await;

        assert!(result.success);
        assert!(result.outputs.is_empty());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn sequential_question_flow_produces_answer() {
        let engine = engine_with(ScriptedLlm::with_responses(["4"]));
        let doc = Workflow::new("wf_qa", "Q&A")
            .with_node(
                Node::new("text-1", "text-input", "Question")
                    .with_config("text", json!("What is 2+2?")),
            )
            .with_node(
                Node::new("chat-1", "ai-chat", "Answer")
                    .with_config("systemPrompt", json!("Answer briefly"))
                    .with_config("maxTokens", json!(10)),
            )
            .with_node(Node::new("debug-1", "debug", "Debug"))
            .with_edge("e1", "text-1", "chat-1")
            .with_edge("e2", "chat-1", "debug-1");

        let result = engine.execute(&doc, Arc::new(NullSink)).await;

        assert!(result.success);
        assert_eq!(result.outputs["chat-1"]["response"], json!("4"));
        assert_eq!(result.outputs["debug-1"]["output"], json!("4"));
        assert!(result.logs.iter().any(|l| l.contains("4")));
    }

    #[tokio::test]
    async fn smart_mapping_binds_response_to_content_with_aliases() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(ScriptedLlm::with_responses(["hello"]));
        engine.node_registry().register(
            NodeTypeDefinition::new("capture", "Capture", weft_core::NodeCategory::Data)
                .with_inputs(vec![Port::text("content")])
                .with_executor(Arc::new(CaptureNode { seen: Arc::clone(&seen) })),
        );

        let doc = Workflow::new("wf_map", "Mapping")
            .with_node(
                Node::new("text-1", "text-input", "T").with_config("text", json!("say hello")),
            )
            .with_node(Node::new("chat-1", "ai-chat", "Chat"))
            .with_node(Node::new("cap-1", "capture", "Capture"))
            .with_edge("e1", "text-1", "chat-1")
            .with_edge("e2", "chat-1", "cap-1");

        let result = engine.execute(&doc, Arc::new(NullSink)).await;
        assert!(result.success, "{:?}", result.error);

        let captured = seen.lock().unwrap();
        let inputs = &captured[0];
        assert_eq!(inputs["content"], json!("hello"));
        assert_eq!(inputs["input"], json!("hello"));
        assert_eq!(inputs["prompt"], json!("hello"));
        assert_eq!(inputs["text"], json!("hello"));
    }

    #[tokio::test]
    async fn tool_attachment_is_not_dataflow() {
        let engine = engine_with(ScriptedLlm::with_responses(["DONE: finished"]));
        let doc = Workflow::new("wf_tools", "Tools")
            .with_node(
                Node::new("text-1", "text-input", "Task")
                    .with_config("text", json!("compute something")),
            )
            .with_node(Node::new("orch-1", "ai-orchestrator", "Agent"))
            .with_node(Node::new("calc-1", "tool-calculator", "Calculator"))
            .with_edge("e1", "text-1", "orch-1")
            .with_edge_full(Edge::new("e2", "calc-1", "orch-1").into_handle(TOOLS_HANDLE));

        let sink = RecordingSink::new();
        let result = engine.execute(&doc, sink.clone() as Arc<dyn ProgressSink>).await;

        assert!(result.success, "{:?}", result.error);
        // The tool node never entered the schedule and produced nothing.
        assert_eq!(sink.running_order(), vec!["text-1", "orch-1"]);
        assert!(!result.outputs.contains_key("calc-1"));
        // The orchestrator ran with the attached tool: its config had no
        // `tools` string, so completion proves `_connected_tools` arrived.
        assert_eq!(result.outputs["orch-1"]["result"], json!("finished"));
    }

    #[tokio::test]
    async fn cycle_is_refused() {
        let engine = engine_with(ScriptedLlm::new());
        let doc = Workflow::new("wf_cycle", "Cycle")
            .with_node(Node::new("a", "text-input", "A"))
            .with_node(Node::new("b", "text-input", "B"))
            .with_edge("e1", "a", "b")
            .with_edge("e2", "b", "a");

        let result = engine.execute(&doc, Arc::new(NullSink)).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("cycle detected"));
        assert!(result.outputs.is_empty());
    }

    #[tokio::test]
    async fn unknown_node_type_is_skipped_not_fatal() {
        let engine = engine_with(ScriptedLlm::new());
        let doc = Workflow::new("wf_unknown", "Unknown")
            .with_node(Node::new("ghost", "does-not-exist", "Ghost"))
            .with_node(
                Node::new("text-1", "text-input", "T").with_config("text", json!("still runs")),
            )
            .with_edge("e1", "ghost", "text-1");

        let result = engine.execute(&doc, Arc::new(NullSink)).await;

        assert!(result.success);
        assert!(!result.outputs.contains_key("ghost"));
        assert_eq!(result.outputs["text-1"]["text"], json!("still runs"));
        assert!(result.logs.iter().any(|l| l.contains("Unknown node type")));
    }

    #[tokio::test]
    async fn first_edge_in_document_order_wins_per_port() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(ScriptedLlm::new());
        engine.node_registry().register(
            NodeTypeDefinition::new("capture", "Capture", weft_core::NodeCategory::Data)
                .with_inputs(vec![Port::new("input", "Input", "any")])
                .with_executor(Arc::new(CaptureNode { seen: Arc::clone(&seen) })),
        );

        let doc = Workflow::new("wf_first", "First wins")
            .with_node(Node::new("a", "text-input", "A").with_config("text", json!("first")))
            .with_node(Node::new("b", "text-input", "B").with_config("text", json!("second")))
            .with_node(Node::new("cap", "capture", "Capture"))
            .with_edge_full(Edge::new("e1", "a", "cap").into_handle("input"))
            .with_edge_full(Edge::new("e2", "b", "cap").into_handle("input"));

        let result = engine.execute(&doc, Arc::new(NullSink)).await;
        assert!(result.success);
        assert_eq!(seen.lock().unwrap()[0]["input"], json!("first"));
    }

    #[tokio::test]
    async fn node_failure_aborts_the_execution() {
        let engine = engine_with(ScriptedLlm::new());
        let doc = Workflow::new("wf_fail", "Fail")
            // json-parse with unparseable input fails its executor.
            .with_node(Node::new("t", "text-input", "T").with_config("text", json!("not json")))
            .with_node(Node::new("p", "json-parse", "Parse"))
            .with_node(Node::new("after", "text-input", "After"))
            .with_edge("e1", "t", "p")
            .with_edge("e2", "p", "after");

        let result = engine.execute(&doc, Arc::new(NullSink)).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("p"));
        assert!(!result.outputs.contains_key("after"));
    }

    #[tokio::test]
    async fn every_executed_node_has_an_output_entry() {
        let engine = engine_with(ScriptedLlm::with_responses(["ok"]));
        let doc = Workflow::new("wf_all", "All")
            .with_node(Node::new("t", "trigger", "Go"))
            .with_node(Node::new("x", "text-input", "X").with_config("text", json!("hi")))
            .with_node(Node::new("c", "ai-chat", "Chat"))
            .with_edge("e1", "x", "c");

        let result = engine.execute(&doc, Arc::new(NullSink)).await;

        assert!(result.success);
        assert_eq!(result.outputs.len(), 3);
    }

    #[test]
    fn result_extraction_follows_priority() {
        let doc = Workflow::new("wf_prio", "Prio")
            .with_node(Node::new("t", "text-input", "T"))
            .with_node(Node::new("c", "ai-chat", "C"))
            .with_node(Node::new("o", "ai-orchestrator", "O"));

        let mut outputs: HashMap<String, PortMap> = HashMap::new();
        outputs.insert(
            "t".into(),
            [("text".to_string(), json!("question"))].into_iter().collect(),
        );
        outputs.insert(
            "c".into(),
            [("response".to_string(), json!("chat says"))].into_iter().collect(),
        );
        outputs.insert(
            "o".into(),
            [("result".to_string(), json!("agent says"))].into_iter().collect(),
        );

        // Orchestrator beats chat.
        assert_eq!(
            extract_primary_result(&doc, &outputs).as_deref(),
            Some("agent says")
        );

        // Empty orchestrator result falls through to memory, then chat.
        outputs.get_mut("o").unwrap().insert("result".into(), json!(""));
        assert_eq!(
            extract_primary_result(&doc, &outputs).as_deref(),
            Some("chat says")
        );

        // text-input alone yields nothing.
        outputs.remove("c");
        outputs.remove("o");
        assert_eq!(extract_primary_result(&doc, &outputs), None);
    }

    #[test]
    fn result_extraction_uses_orchestrator_memory_fallback() {
        let doc = Workflow::new("wf_mem", "Mem").with_node(Node::new("o", "ai-orchestrator", "O"));
        let mut outputs: HashMap<String, PortMap> = HashMap::new();
        outputs.insert(
            "o".into(),
            [
                ("result".to_string(), json!("")),
                ("memory".to_string(), json!({ "final_result": "from memory" })),
            ]
            .into_iter()
            .collect(),
        );

        assert_eq!(
            extract_primary_result(&doc, &outputs).as_deref(),
            Some("from memory")
        );
    }
}
