//! The node-type registry and the built-in node set.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::json;

use weft_core::{NodeCategory, Port, TOOL_NODE_PREFIX};
use weft_tools::ToolRegistry;

use crate::ai::{AiChatNode, AiTransformNode};
use crate::basic::{DebugNode, JsonParseNode, LoopNode, TextInputNode, TriggerNode};
use crate::io::{FileReadNode, FileWriteNode, HttpRequestNode};
use crate::orchestrate::OrchestratorNode;
use crate::NodeTypeDefinition;

/// Process-wide catalog of node types. Registration replaces any
/// existing entry with the same id.
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, Arc<NodeTypeDefinition>>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a node type, replacing any existing entry with its id.
    pub fn register(&self, definition: NodeTypeDefinition) {
        self.nodes
            .write()
            .expect("node registry lock")
            .insert(definition.id.clone(), Arc::new(definition));
    }

    /// Resolves a node-type id.
    pub fn get(&self, type_id: &str) -> Option<Arc<NodeTypeDefinition>> {
        self.nodes
            .read()
            .expect("node registry lock")
            .get(type_id)
            .cloned()
    }

    /// All registered definitions, sorted by id for stable listings.
    pub fn list(&self) -> Vec<Arc<NodeTypeDefinition>> {
        let mut defs: Vec<_> = self
            .nodes
            .read()
            .expect("node registry lock")
            .values()
            .cloned()
            .collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    pub fn len(&self) -> usize {
        self.nodes.read().expect("node registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Installs the built-in dataflow node set.
pub fn install_builtins(registry: &NodeRegistry) {
    registry.register(
        NodeTypeDefinition::new("trigger", "Trigger", NodeCategory::Trigger)
            .with_outputs(vec![Port::new("trigger", "Trigger", "boolean")])
            .with_executor(Arc::new(TriggerNode)),
    );

    registry.register(
        NodeTypeDefinition::new("text-input", "Text Input", NodeCategory::Data)
            .with_outputs(vec![Port::text("text")])
            .with_config_schema(json!({ "text": { "type": "string" } }))
            .with_executor(Arc::new(TextInputNode)),
    );

    registry.register(
        NodeTypeDefinition::new("ai-chat", "AI Chat", NodeCategory::Ai)
            .with_inputs(vec![Port::text("prompt")])
            .with_outputs(vec![Port::text("response")])
            .with_config_schema(json!({
                "systemPrompt": { "type": "string" },
                "maxTokens": { "type": "number" },
                "temperature": { "type": "number" }
            }))
            .with_executor(Arc::new(AiChatNode)),
    );

    registry.register(
        NodeTypeDefinition::new("ai-transform", "AI Transform", NodeCategory::Ai)
            .with_inputs(vec![Port::text("content"), Port::text("instruction")])
            .with_outputs(vec![Port::text("output")])
            .with_config_schema(json!({ "instruction": { "type": "string" } }))
            .with_executor(Arc::new(AiTransformNode)),
    );

    registry.register(
        NodeTypeDefinition::new("debug", "Debug", NodeCategory::Output)
            .with_inputs(vec![Port::new("input", "Input", "any")])
            .with_outputs(vec![Port::new("output", "Output", "any")])
            .with_executor(Arc::new(DebugNode)),
    );

    registry.register(
        NodeTypeDefinition::new("http-request", "HTTP Request", NodeCategory::Data)
            .with_inputs(vec![Port::text("url"), Port::text("body")])
            .with_outputs(vec![Port::new("response", "Response", "object")])
            .with_config_schema(json!({
                "url": { "type": "string" },
                "method": { "type": "string" }
            }))
            .with_executor(Arc::new(HttpRequestNode::new())),
    );

    registry.register(
        NodeTypeDefinition::new("file-read", "File Read", NodeCategory::Data)
            .with_inputs(vec![Port::text("path")])
            .with_outputs(vec![Port::text("content")])
            .with_config_schema(json!({ "path": { "type": "string" } }))
            .with_executor(Arc::new(FileReadNode)),
    );

    registry.register(
        NodeTypeDefinition::new("file-write", "File Write", NodeCategory::Data)
            .with_inputs(vec![Port::text("content"), Port::text("path")])
            .with_outputs(vec![Port::new("written", "Written", "boolean")])
            .with_config_schema(json!({ "path": { "type": "string" } }))
            .with_executor(Arc::new(FileWriteNode)),
    );

    registry.register(
        NodeTypeDefinition::new("json-parse", "JSON Parse", NodeCategory::Data)
            .with_inputs(vec![Port::new("input", "Input", "any")])
            .with_outputs(vec![Port::new("output", "Output", "any")])
            .with_config_schema(json!({ "field": { "type": "string" } }))
            .with_executor(Arc::new(JsonParseNode)),
    );

    registry.register(
        NodeTypeDefinition::new("loop", "Loop", NodeCategory::Data)
            .with_inputs(vec![Port::new("items", "Items", "array")])
            .with_outputs(vec![
                Port::new("results", "Results", "array"),
                Port::new("count", "Count", "number"),
            ])
            .with_config_schema(json!({ "template": { "type": "string" } }))
            .with_executor(Arc::new(LoopNode)),
    );
}

/// Registers a tool node (`tool-<name>`) per tool currently in the
/// tool registry. Tool nodes never execute; they advertise the tool's
/// schema to orchestrators they are attached to.
pub fn install_tool_nodes(registry: &NodeRegistry, tools: &ToolRegistry) {
    for schema in tools.list() {
        let type_id = format!("{TOOL_NODE_PREFIX}{}", schema.name);
        registry.register(
            NodeTypeDefinition::new(type_id, schema.name.clone(), NodeCategory::Tool)
                .with_tool_schema(schema),
        );
    }
}

/// Registers the `ai-orchestrator` node. Registered separately from
/// the built-in set: its executor resolves tools against the live
/// registry carried by the execution context.
pub fn install_orchestrator_node(registry: &NodeRegistry) {
    registry.register(
        NodeTypeDefinition::new("ai-orchestrator", "AI Orchestrator", NodeCategory::Ai)
            .with_inputs(vec![
                Port::text("task"),
                Port::new("tools", "Tools", "tools"),
            ])
            .with_outputs(vec![
                Port::text("result"),
                Port::new("memory", "Memory", "object"),
            ])
            .with_config_schema(json!({
                "tools": { "type": "string" },
                "maxSteps": { "type": "number" },
                "systemPrompt": { "type": "string" }
            }))
            .with_executor(Arc::new(OrchestratorNode)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_install_once_and_resolve() {
        let registry = NodeRegistry::new();
        install_builtins(&registry);
        install_orchestrator_node(&registry);

        assert!(registry.get("text-input").is_some());
        assert!(registry.get("ai-orchestrator").is_some());
        assert!(registry.get("nope").is_none());

        let chat = registry.get("ai-chat").unwrap();
        assert!(chat.has_input("prompt"));
        assert_eq!(chat.first_output(), Some("response"));
    }

    #[test]
    fn registration_replaces_by_id() {
        let registry = NodeRegistry::new();
        install_builtins(&registry);
        let before = registry.len();
        install_builtins(&registry);
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn tool_nodes_advertise_schemas_without_executors() {
        let tools = ToolRegistry::with_defaults();
        let registry = NodeRegistry::new();
        install_tool_nodes(&registry, &tools);

        let calc = registry.get("tool-calculator").unwrap();
        assert!(!calc.is_executable());
        assert_eq!(calc.tool_schema.as_ref().unwrap().name, "calculator");
        assert_eq!(calc.category, weft_core::NodeCategory::Tool);
    }
}
