//! LLM-backed node executors: ai-chat and ai-transform.

use async_trait::async_trait;
use serde_json::{json, Value};

use weft_core::PortMap;
use weft_llm::GenerateOptions;

use crate::basic::{config_str, input_value, value_to_string};
use crate::{ExecutionContext, NodeError, NodeExecutor};

fn generate_options(config: &PortMap) -> GenerateOptions {
    GenerateOptions {
        system_prompt: config_str(config, "systemPrompt").map(String::from),
        max_tokens: config
            .get("maxTokens")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        temperature: config
            .get("temperature")
            .and_then(Value::as_f64)
            .map(|t| t as f32),
    }
}

/// `ai-chat` — one LLM call over the incoming prompt.
pub struct AiChatNode;

#[async_trait]
impl NodeExecutor for AiChatNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let prompt = input_value(inputs, &["prompt", "input", "text"])
            .map(value_to_string)
            .or_else(|| config_str(config, "prompt").map(String::from))
            .ok_or_else(|| NodeError::Input("ai-chat received no prompt".into()))?;

        let opts = generate_options(config);
        ctx.log(format!("ai-chat: prompting model ({} chars)", prompt.len()));
        let response = ctx.llm.generate(&prompt, &opts).await?;
        ctx.log(format!("ai-chat: response ({} chars)", response.len()));

        let mut out = PortMap::new();
        out.insert("response".into(), json!(response));
        Ok(out)
    }
}

/// `ai-transform` — rewrites incoming content according to a
/// configured instruction.
pub struct AiTransformNode;

#[async_trait]
impl NodeExecutor for AiTransformNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let content = input_value(inputs, &["content", "input", "text"])
            .map(value_to_string)
            .ok_or_else(|| NodeError::Input("ai-transform received no content".into()))?;

        let instruction = input_value(inputs, &["instruction"])
            .map(value_to_string)
            .or_else(|| config_str(config, "instruction").map(String::from))
            .unwrap_or_else(|| "Transform the following content.".to_string());

        let prompt = format!("{instruction}\n\n{content}");
        let opts = generate_options(config);

        ctx.log(format!("ai-transform: {} chars in", content.len()));
        let output = ctx.llm.generate(&prompt, &opts).await?;

        let mut out = PortMap::new();
        out.insert("output".into(), json!(output));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use weft_core::NullSink;
    use weft_llm::ScriptedLlm;
    use weft_tools::ToolRegistry;

    fn ctx_with(llm: ScriptedLlm) -> ExecutionContext {
        ExecutionContext::new(
            "wf_test",
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
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
    async fn ai_chat_returns_response_port() {
        let llm = ScriptedLlm::with_responses(["4"]);
        let ctx = ctx_with(llm.clone());

        let out = AiChatNode
            .execute(
                &map(&[("prompt", json!("What is 2+2?"))]),
                &map(&[("systemPrompt", json!("Answer briefly")), ("maxTokens", json!(10))]),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(out["response"], json!("4"));
        assert_eq!(llm.prompts(), vec!["What is 2+2?"]);
    }

    #[tokio::test]
    async fn ai_chat_without_prompt_is_an_input_error() {
        let ctx = ctx_with(ScriptedLlm::new());
        let err = AiChatNode
            .execute(&PortMap::new(), &PortMap::new(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Input(_)));
    }

    #[tokio::test]
    async fn ai_transform_combines_instruction_and_content() {
        let llm = ScriptedLlm::with_responses(["HELLO"]);
        let ctx = ctx_with(llm.clone());

        let out = AiTransformNode
            .execute(
                &map(&[("content", json!("hello"))]),
                &map(&[("instruction", json!("Uppercase this"))]),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(out["output"], json!("HELLO"));
        assert!(llm.prompts()[0].starts_with("Uppercase this\n\nhello"));
    }
}
