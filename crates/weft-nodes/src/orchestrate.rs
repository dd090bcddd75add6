//! The `ai-orchestrator` node: delegates to the ReAct loop with the
//! tools attached to it on the canvas (or named in its config).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use weft_core::{NodeStatus, PortMap, ToolSchema};
use weft_orchestrator::{EventCallback, Orchestrator, OrchestratorConfig, OrchestratorEvent};

use crate::basic::{config_str, input_value, node_id, value_to_string};
use crate::{ExecutionContext, NodeError, NodeExecutor, CONNECTED_TOOLS_KEY};

const DEFAULT_MAX_STEPS: usize = 5;

pub struct OrchestratorNode;

/// Resolves the tools this run may use: canvas attachments win, the
/// comma-separated `tools` config is the fallback, and either way only
/// names present in the live registry survive.
fn resolve_enabled_tools(config: &PortMap, ctx: &ExecutionContext) -> Vec<String> {
    let connected: Vec<String> = config
        .get(CONNECTED_TOOLS_KEY)
        .and_then(Value::as_array)
        .map(|schemas| {
            schemas
                .iter()
                .filter_map(|s| serde_json::from_value::<ToolSchema>(s.clone()).ok())
                .map(|s| s.name)
                .collect()
        })
        .unwrap_or_default();

    if !connected.is_empty() {
        return connected;
    }

    config_str(config, "tools")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && ctx.tools.has(name))
        .map(String::from)
        .collect()
}

#[async_trait]
impl NodeExecutor for OrchestratorNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let task = input_value(inputs, &["task", "input", "prompt", "text"])
            .map(value_to_string)
            .ok_or_else(|| NodeError::Input("ai-orchestrator received no task".into()))?;

        let id = node_id(config);
        let enabled_tools = resolve_enabled_tools(config, ctx);

        let orchestrator_config = OrchestratorConfig {
            max_steps: config
                .get("maxSteps")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_MAX_STEPS),
            enabled_tools,
            system_prompt: config_str(config, "systemPrompt").map(String::from),
        };

        ctx.log(format!(
            "ai-orchestrator[{id}]: task ({} chars), tools [{}]",
            task.len(),
            orchestrator_config.enabled_tools.join(", ")
        ));

        // Surface loop progress as node output events.
        let progress_ctx = ctx.clone();
        let progress_id = id.clone();
        let on_event: EventCallback = Arc::new(move |event| {
            let data = match event {
                OrchestratorEvent::Thought(thought) => json!({ "thought": thought }),
                OrchestratorEvent::Action { tool, input } => {
                    json!({ "action": tool, "input": input })
                }
                OrchestratorEvent::ToolComplete { tool, result } => {
                    json!({ "tool": tool, "result": result })
                }
                OrchestratorEvent::StepResult { step, result } => {
                    json!({ "step": step, "result": result })
                }
                OrchestratorEvent::Complete(result) => json!({ "result": result }),
                OrchestratorEvent::Error(error) => json!({ "error": error }),
            };
            progress_ctx.send_progress(&progress_id, NodeStatus::Output, Some(data));
        });

        let orchestrator = Orchestrator::new(Arc::clone(&ctx.llm), Arc::clone(&ctx.tools));
        let memory = orchestrator
            .run(&task, &orchestrator_config, Some(on_event))
            .await;

        let mut out = PortMap::new();
        out.insert(
            "result".into(),
            json!(memory.final_result.clone().unwrap_or_default()),
        );
        out.insert("status".into(), serde_json::to_value(memory.status).unwrap_or(Value::Null));
        out.insert("memory".into(), serde_json::to_value(&memory).unwrap_or(Value::Null));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use weft_core::{NullSink, OrchestratorStatus};
    use weft_llm::ScriptedLlm;
    use weft_tools::ToolRegistry;

    fn ctx_with(llm: ScriptedLlm) -> ExecutionContext {
        ExecutionContext::new(
            "wf_test",
            Arc::new(llm),
            Arc::new(ToolRegistry::with_defaults()),
            Arc::new(NullSink),
        )
    }

    fn map(entries: &[(&str, Value)]) -> PortMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn no_tools_yields_error_status_output() {
        let ctx = ctx_with(ScriptedLlm::new());
        let out = OrchestratorNode
            .execute(&map(&[("task", json!("do something"))]), &PortMap::new(), &ctx)
            .await
            .unwrap();

        assert_eq!(out["status"], json!("error"));
        assert_eq!(out["result"], json!("no tools"));
    }

    #[tokio::test]
    async fn connected_tools_take_priority_over_config() {
        let llm = ScriptedLlm::with_responses(["DONE: fine"]);
        let ctx = ctx_with(llm.clone());

        let schema = ToolSchema::object("calculator", "math", &[], &[]);
        let config = map(&[
            ("tools", json!("datetime")),
            (CONNECTED_TOOLS_KEY, json!([schema])),
        ]);

        let out = OrchestratorNode
            .execute(&map(&[("task", json!("compute"))]), &config, &ctx)
            .await
            .unwrap();

        assert_eq!(out["result"], json!("fine"));
        // The session's system prompt enumerated the attached tool only.
        let memory: weft_core::OrchestratorMemory =
            serde_json::from_value(out["memory"].clone()).unwrap();
        assert_eq!(memory.status, OrchestratorStatus::Complete);
    }

    #[tokio::test]
    async fn config_tools_are_intersected_with_registry() {
        let llm = ScriptedLlm::with_responses(["DONE: ok"]);
        let ctx = ctx_with(llm);

        let config = map(&[("tools", json!("calculator, not-a-tool"))]);
        let out = OrchestratorNode
            .execute(&map(&[("task", json!("compute"))]), &config, &ctx)
            .await
            .unwrap();

        assert_eq!(out["status"], json!("complete"));
    }
}
