//! Command extraction from LLM replies and the per-session command
//! executor.
//!
//! The chat model is asked to frame workflow commands as JSON, but the
//! frame varies: dedicated ```command fences, ```json fences, bare
//! fences, inline backticks, or raw `{"action": ...}` objects in prose.
//! Frames are tried in that order; the first kind that yields commands
//! wins, and insertion order is preserved.

use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use weft_core::{Edge, Node, NullSink, Workflow};
use weft_engine::{extract_primary_result, Engine};
use weft_store::{TemplateRegistry, WorkflowStore};

use crate::session::CanvasState;

fn command_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```command\s*(.*?)```").expect("valid regex"))
}

fn json_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("valid regex"))
}

fn bare_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:\w+)?\s*(.*?)```").expect("valid regex"))
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid regex"))
}

fn loose_action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\{"action"\s*:\s*"[^"]*"[^}]*\}"#).expect("valid regex"))
}

/// Commands found in one block: a JSON object or array, or one JSON
/// object per line.
fn parse_block(block: &str) -> Vec<Value> {
    let block = block.trim();
    if block.is_empty() {
        return Vec::new();
    }

    if let Ok(value) = serde_json::from_str::<Value>(block) {
        return match value {
            Value::Array(items) => items.into_iter().filter(has_action).collect(),
            object if has_action(&object) => vec![object],
            _ => Vec::new(),
        };
    }

    // Several JSON objects separated by newlines.
    block
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .filter(has_action)
        .collect()
}

fn has_action(value: &Value) -> bool {
    value.get("action").and_then(Value::as_str).is_some()
}

/// Extracts command records from a model reply, trying each frame kind
/// in order and stopping at the first that yields any.
pub fn extract_commands(response: &str) -> Vec<Value> {
    let fence_frames = [command_fence_re(), json_fence_re(), bare_fence_re()];
    for frame in fence_frames {
        let commands: Vec<Value> = frame
            .captures_iter(response)
            .filter_map(|c| c.get(1))
            .flat_map(|m| parse_block(m.as_str()))
            .collect();
        if !commands.is_empty() {
            return commands;
        }
    }

    let inline: Vec<Value> = inline_code_re()
        .captures_iter(response)
        .filter_map(|c| c.get(1))
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
        .filter(has_action)
        .collect();
    if !inline.is_empty() {
        return inline;
    }

    loose_action_re()
        .find_iter(response)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter(has_action)
        .collect()
}

/// Outcome of one executed command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub result: String,
}

impl CommandResult {
    fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: result.into(),
        }
    }

    fn fail(result: impl Into<String>) -> Self {
        Self {
            success: false,
            result: result.into(),
        }
    }
}

fn str_arg<'a>(command: &'a Value, key: &str) -> Option<&'a str> {
    command.get(key).and_then(Value::as_str)
}

/// Executes chat commands against a session's canvas, the workflow
/// store, and the engine.
pub struct CommandExecutor {
    engine: Arc<Engine>,
    store: Arc<WorkflowStore>,
    templates: Arc<TemplateRegistry>,
}

impl CommandExecutor {
    pub fn new(
        engine: Arc<Engine>,
        store: Arc<WorkflowStore>,
        templates: Arc<TemplateRegistry>,
    ) -> Self {
        Self {
            engine,
            store,
            templates,
        }
    }

    /// Dispatches one command record.
    pub async fn execute(&self, canvas: &mut CanvasState, command: &Value) -> CommandResult {
        let Some(action) = str_arg(command, "action") else {
            return CommandResult::fail("Command missing action");
        };
        info!("Chat command: {action}");

        match action {
            "addNode" => self.add_node(canvas, command),
            "connect" => self.connect(canvas, command),
            "clear" => {
                canvas.reset();
                CommandResult::ok("Canvas cleared")
            }
            "loadTemplate" => self.load_template(canvas, command),
            "run" => self.run(canvas, command).await,
            "getWorkflow" => match serde_json::to_string_pretty(&canvas.to_json()) {
                Ok(json) => CommandResult::ok(json),
                Err(e) => CommandResult::fail(format!("Cannot serialize workflow: {e}")),
            },
            "saveWorkflow" => self.save_workflow(canvas, command),
            "loadWorkflow" => self.load_workflow(canvas, command),
            "listWorkflows" => self.list_workflows(),
            "deleteWorkflow" => self.delete_workflow(command),
            "renameWorkflow" => self.rename_workflow(command),
            other => CommandResult::fail(format!("Unknown action: {other}")),
        }
    }

    fn add_node(&self, canvas: &mut CanvasState, command: &Value) -> CommandResult {
        let Some(type_id) = str_arg(command, "type") else {
            return CommandResult::fail("addNode requires a type");
        };
        let label = str_arg(command, "label").unwrap_or(type_id).to_string();

        let id = format!("node_{}", canvas.next_id);
        canvas.next_id += 1;

        let index = canvas.nodes.len() as f64;
        let mut node = Node::new(&id, type_id, &label).at(150.0 + 200.0 * index, 200.0);
        if let Some(Value::Object(config)) = command.get("config") {
            node.data.config = config.clone();
        }
        canvas.nodes.push(node);

        CommandResult::ok(format!("Added node \"{label}\" ({id})"))
    }

    fn connect(&self, canvas: &mut CanvasState, command: &Value) -> CommandResult {
        let (Some(from), Some(to)) = (str_arg(command, "from"), str_arg(command, "to")) else {
            return CommandResult::fail("connect requires from and to");
        };

        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let mut edge = Edge::new(format!("edge_{ms}"), from, to);
        edge.source_handle = str_arg(command, "sourceHandle").map(String::from);
        edge.target_handle = str_arg(command, "targetHandle").map(String::from);
        canvas.edges.push(edge);

        CommandResult::ok(format!("Connected {from} → {to}"))
    }

    fn load_template(&self, canvas: &mut CanvasState, command: &Value) -> CommandResult {
        let Some(id) = str_arg(command, "id") else {
            return CommandResult::fail("loadTemplate requires an id");
        };
        let Some(template) = self.templates.get(id) else {
            return CommandResult::fail(format!("Template not found: {id}"));
        };

        canvas.set_contents(template.nodes.clone(), template.edges.clone());
        CommandResult::ok(format!(
            "Loaded template \"{}\": {} nodes, {} edges",
            template.name,
            canvas.nodes.len(),
            canvas.edges.len()
        ))
    }

    async fn run(&self, canvas: &mut CanvasState, command: &Value) -> CommandResult {
        let doc: Workflow = match str_arg(command, "templateId") {
            Some(id) => match self.templates.get(id) {
                Some(template) => template.clone(),
                None => return CommandResult::fail(format!("Template not found: {id}")),
            },
            None => canvas.to_workflow("chat-canvas", "Chat Canvas"),
        };

        if doc.nodes.is_empty() {
            return CommandResult::fail("Nothing to run: the canvas is empty");
        }

        let result = self.engine.execute(&doc, Arc::new(NullSink)).await;
        if !result.success {
            return CommandResult::fail(format!(
                "Workflow failed: {}",
                result.error.unwrap_or_else(|| "unknown error".into())
            ));
        }

        let summary = extract_primary_result(&doc, &result.outputs)
            .unwrap_or_else(|| "Workflow completed".to_string());
        CommandResult::ok(format!("Workflow result: {summary}"))
    }

    fn save_workflow(&self, canvas: &mut CanvasState, command: &Value) -> CommandResult {
        let Some(name) = str_arg(command, "name") else {
            return CommandResult::fail("saveWorkflow requires a name");
        };

        match self.store.save(
            name,
            canvas.nodes.clone(),
            canvas.edges.clone(),
            str_arg(command, "description"),
            str_arg(command, "id"),
        ) {
            Ok(saved) => CommandResult::ok(format!("Saved \"{}\" ({})", saved.name, saved.id)),
            Err(e) => CommandResult::fail(format!("Save failed: {e}")),
        }
    }

    fn load_workflow(&self, canvas: &mut CanvasState, command: &Value) -> CommandResult {
        let Some(id) = str_arg(command, "id") else {
            return CommandResult::fail("loadWorkflow requires an id");
        };

        match self.store.get(id) {
            Ok(Some(saved)) => {
                canvas.set_contents(saved.nodes.clone(), saved.edges.clone());
                CommandResult::ok(format!(
                    "Loaded \"{}\": {} nodes, {} edges",
                    saved.name,
                    canvas.nodes.len(),
                    canvas.edges.len()
                ))
            }
            Ok(None) => CommandResult::fail(format!("Workflow not found: {id}")),
            Err(e) => CommandResult::fail(format!("Load failed: {e}")),
        }
    }

    fn list_workflows(&self) -> CommandResult {
        let workflows = self.store.list();
        if workflows.is_empty() {
            return CommandResult::ok("No saved workflows");
        }
        let listing: Vec<String> = workflows
            .iter()
            .map(|w| format!("{} ({})", w.name, w.id))
            .collect();
        CommandResult::ok(listing.join("\n"))
    }

    fn delete_workflow(&self, command: &Value) -> CommandResult {
        let Some(id) = str_arg(command, "id") else {
            return CommandResult::fail("deleteWorkflow requires an id");
        };
        match self.store.delete(id) {
            Ok(true) => CommandResult::ok(format!("Deleted workflow {id}")),
            Ok(false) => CommandResult::fail(format!("Workflow not found: {id}")),
            Err(e) => CommandResult::fail(format!("Delete failed: {e}")),
        }
    }

    fn rename_workflow(&self, command: &Value) -> CommandResult {
        let (Some(id), Some(name)) = (str_arg(command, "id"), str_arg(command, "name")) else {
            return CommandResult::fail("renameWorkflow requires id and name");
        };
        match self.store.rename(id, name) {
            Ok(renamed) => CommandResult::ok(format!("Renamed workflow to \"{}\"", renamed.name)),
            Err(e) => CommandResult::fail(format!("Rename failed: {e}")),
        }
    }
}

/// Convenience JSON for building command records in tests.
#[cfg(test)]
fn command(action: &str, fields: &[(&str, Value)]) -> Value {
    let mut object = json!({ "action": action });
    for (key, value) in fields {
        object[*key] = value.clone();
    }
    object
}

#[cfg(test)]
mod tests {
    use super::*;

    use weft_llm::ScriptedLlm;
    use weft_nodes::{install_builtins, NodeRegistry};
    use weft_tools::ToolRegistry;

    fn executor() -> (tempfile::TempDir, CommandExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WorkflowStore::new(dir.path()).unwrap());
        let nodes = Arc::new(NodeRegistry::new());
        install_builtins(&nodes);
        let engine = Arc::new(Engine::new(
            nodes,
            Arc::new(ToolRegistry::new()),
            Arc::new(ScriptedLlm::new()),
        ));
        let templates = Arc::new(TemplateRegistry::with_builtins());
        (dir, CommandExecutor::new(engine, store, templates))
    }

    #[test]
    fn command_fences_win_over_other_frames() {
        let response = "Sure:\n```command\n{\"action\":\"clear\"}\n```\nand `{\"action\":\"listWorkflows\"}` too";
        let commands = extract_commands(response);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["action"], "clear");
    }

    #[test]
    fn json_fence_arrays_preserve_order() {
        let response = "```json\n[{\"action\":\"clear\"},{\"action\":\"addNode\",\"type\":\"debug\"}]\n```";
        let commands = extract_commands(response);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0]["action"], "clear");
        assert_eq!(commands[1]["action"], "addNode");
    }

    #[test]
    fn multiple_json_lines_in_one_block_parse_individually() {
        let response = "```command\n{\"action\":\"clear\"}\n{\"action\":\"listWorkflows\"}\n```";
        let commands = extract_commands(response);
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn inline_backticks_are_a_fallback() {
        let response = "Run `{\"action\":\"listWorkflows\"}` to see them.";
        let commands = extract_commands(response);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["action"], "listWorkflows");
    }

    #[test]
    fn loose_objects_are_the_last_resort() {
        let response = "I will clear it now: {\"action\": \"clear\"} done.";
        let commands = extract_commands(response);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["action"], "clear");
    }

    #[test]
    fn prose_without_commands_yields_nothing() {
        assert!(extract_commands("Just chatting, no commands here.").is_empty());
    }

    #[tokio::test]
    async fn add_connect_clear_round_trip() {
        let (_dir, executor) = executor();
        let mut canvas = CanvasState::default();

        let added = executor
            .execute(
                &mut canvas,
                &command("addNode", &[("type", json!("text-input")), ("label", json!("In"))]),
            )
            .await;
        assert!(added.success);
        assert_eq!(added.result, "Added node \"In\" (node_1)");

        executor
            .execute(&mut canvas, &command("addNode", &[("type", json!("debug"))]))
            .await;
        assert_eq!(canvas.nodes[1].position.x, 350.0);

        let connected = executor
            .execute(
                &mut canvas,
                &command("connect", &[("from", json!("node_1")), ("to", json!("node_2"))]),
            )
            .await;
        assert_eq!(connected.result, "Connected node_1 → node_2");
        assert_eq!(canvas.edges.len(), 1);

        let cleared = executor.execute(&mut canvas, &command("clear", &[])).await;
        assert_eq!(cleared.result, "Canvas cleared");
        assert!(canvas.nodes.is_empty());
        assert_eq!(canvas.next_id, 1);
    }

    #[tokio::test]
    async fn load_template_sets_next_id_from_suffixes() {
        let (_dir, executor) = executor();
        let mut canvas = CanvasState::default();

        let loaded = executor
            .execute(
                &mut canvas,
                &command("loadTemplate", &[("id", json!("simple-chat"))]),
            )
            .await;
        assert!(loaded.success, "{}", loaded.result);
        assert_eq!(canvas.nodes.len(), 3);
        // Template ids are text-1/chat-1/debug-1: max suffix 1, so next is 2.
        assert_eq!(canvas.next_id, 2);
    }

    #[tokio::test]
    async fn run_reports_the_workflow_result() {
        let (_dir, executor) = executor();
        let mut canvas = CanvasState::default();

        let mut config = serde_json::Map::new();
        config.insert("text".into(), json!("ping"));
        executor
            .execute(
                &mut canvas,
                &command(
                    "addNode",
                    &[("type", json!("text-input")), ("config", Value::Object(config))],
                ),
            )
            .await;
        executor
            .execute(&mut canvas, &command("addNode", &[("type", json!("debug"))]))
            .await;
        executor
            .execute(
                &mut canvas,
                &command("connect", &[("from", json!("node_1")), ("to", json!("node_2"))]),
            )
            .await;

        let run = executor.execute(&mut canvas, &command("run", &[])).await;
        assert!(run.success);
        assert_eq!(run.result, "Workflow result: ping");
    }

    #[tokio::test]
    async fn workflow_crud_commands() {
        let (_dir, executor) = executor();
        let mut canvas = CanvasState::default();
        executor
            .execute(&mut canvas, &command("addNode", &[("type", json!("debug"))]))
            .await;

        let saved = executor
            .execute(&mut canvas, &command("saveWorkflow", &[("name", json!("Mine"))]))
            .await;
        assert!(saved.success);
        let id = saved
            .result
            .rsplit('(')
            .next()
            .unwrap()
            .trim_end_matches(')')
            .to_string();

        let listing = executor.execute(&mut canvas, &command("listWorkflows", &[])).await;
        assert!(listing.result.contains("Mine"));

        let renamed = executor
            .execute(
                &mut canvas,
                &command("renameWorkflow", &[("id", json!(id)), ("name", json!("Yours"))]),
            )
            .await;
        assert!(renamed.success);

        let loaded = executor
            .execute(&mut canvas, &command("loadWorkflow", &[("id", json!(id))]))
            .await;
        assert!(loaded.result.contains("Yours"));

        let deleted = executor
            .execute(&mut canvas, &command("deleteWorkflow", &[("id", json!(id))]))
            .await;
        assert!(deleted.success);

        let missing = executor
            .execute(&mut canvas, &command("deleteWorkflow", &[("id", json!(id))]))
            .await;
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn unknown_action_is_reported() {
        let (_dir, executor) = executor();
        let mut canvas = CanvasState::default();
        let result = executor
            .execute(&mut canvas, &command("teleport", &[]))
            .await;
        assert!(!result.success);
        assert_eq!(result.result, "Unknown action: teleport");
    }
}
