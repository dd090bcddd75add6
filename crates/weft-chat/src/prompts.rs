//! Prompt construction for the chat surface.

/// The instrumented build script injected into the builder
/// meta-workflow's text-input node. Wraps the user's request in an
/// explicit step list the builder orchestrator follows tool by tool.
pub fn build_prompt(request: &str) -> String {
    format!(
        r#"Build a workflow for this request: "{request}"

Follow these steps EXACTLY, one tool call per turn, waiting for each RESULT: before the next step:

1. ACTION: clear_canvas
   INPUT: {{}}
2. ACTION: add_node
   INPUT: {{"type": "text-input", "label": "Input", "config_text": "<the text the workflow starts from, based on the request>"}}
3. ACTION: add_node
   INPUT: {{"type": "ai-chat", "label": "Process", "config_systemPrompt": "<a system prompt tailored to the request>"}}
4. ACTION: add_node
   INPUT: {{"type": "debug", "label": "Output"}}
5. ACTION: connect_nodes
   INPUT: {{"from_node_id": "node_1", "to_node_id": "node_2"}}
6. ACTION: connect_nodes
   INPUT: {{"from_node_id": "node_2", "to_node_id": "node_3"}}
7. DONE: Workflow built"#
    )
}

/// System prompt for freeform chat: enumerates the available templates
/// and plugins and teaches the command frame.
pub fn chat_system_prompt(templates: &[(String, String)], plugins: &[String]) -> String {
    let template_list = if templates.is_empty() {
        "  (none)".to_string()
    } else {
        templates
            .iter()
            .map(|(id, name)| format!("  - {name} (id: {id})"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let plugin_list = if plugins.is_empty() {
        "  (none)".to_string()
    } else {
        plugins
            .iter()
            .map(|name| format!("  - {name}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are the assistant for a visual workflow editor. You help users manage and run workflows.

Available templates:
{template_list}

Loaded plugins:
{plugin_list}

When the user asks you to change or run a workflow, emit commands as JSON in a fenced block:

```command
{{"action": "addNode", "type": "ai-chat", "label": "Summarize"}}
```

Supported actions: addNode, connect, clear, loadTemplate, run, getWorkflow, saveWorkflow, loadWorkflow, listWorkflows, deleteWorkflow, renameWorkflow.
For conversation that needs no commands, just answer normally."#
    )
}
