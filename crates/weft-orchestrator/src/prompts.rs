//! Prompt construction for the ReAct loop.

/// Protocol instructions appended to every orchestrator system prompt.
pub const PROTOCOL_INSTRUCTIONS: &str = r#"Respond using EXACTLY ONE of these two forms per turn:

ACTION: <tool name>
INPUT: <JSON object with the tool's parameters>

OR

DONE: <your final answer>

You may include a single THOUGHT: line before an ACTION.
After an ACTION, wait for a RESULT: reply before doing anything else.
Never invent a RESULT: yourself."#;

/// Prompt sent when a turn contained nothing actionable.
pub const CONTINUE_PROMPT: &str = "Continue. Use a tool or say DONE.";

/// Builds the orchestrator system prompt: the caller's custom preamble
/// (when present), the enabled-tool catalog, and the protocol text.
pub fn system_prompt(tools_fragment: &str, custom: Option<&str>) -> String {
    let preamble = custom
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("You are an autonomous agent that completes tasks step by step using tools.");

    format!(
        "{preamble}\n\nAvailable tools:\n{tools_fragment}\n{PROTOCOL_INSTRUCTIONS}"
    )
}

/// The first user turn of a run.
pub fn task_prompt(task: &str) -> String {
    format!("Task: {task}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_embeds_tools_and_protocol() {
        let prompt = system_prompt("• calculator: math\n", None);
        assert!(prompt.contains("• calculator: math"));
        assert!(prompt.contains("ACTION: <tool name>"));
        assert!(prompt.contains("DONE: <your final answer>"));
    }

    #[test]
    fn custom_preamble_replaces_default() {
        let prompt = system_prompt("", Some("You are a workflow builder."));
        assert!(prompt.starts_with("You are a workflow builder."));
        assert!(!prompt.contains("autonomous agent"));
    }
}
