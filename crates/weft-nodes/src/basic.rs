//! Data-shaping node executors: trigger, text-input, debug, json-parse, loop.

use async_trait::async_trait;
use serde_json::{json, Value};

use weft_core::{NodeStatus, PortMap};

use crate::{ExecutionContext, NodeError, NodeExecutor, NODE_ID_KEY};

/// Renders a value for prompt/log contexts: strings stay bare,
/// everything else becomes compact JSON.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First present input among the given port names.
pub(crate) fn input_value<'a>(inputs: &'a PortMap, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| inputs.get(*k))
}

/// String-valued config entry.
pub(crate) fn config_str<'a>(config: &'a PortMap, key: &str) -> Option<&'a str> {
    config.get(key).and_then(Value::as_str)
}

pub(crate) fn node_id(config: &PortMap) -> String {
    config_str(config, NODE_ID_KEY).unwrap_or("unknown").to_string()
}

/// `trigger` — starts a run and stamps it.
pub struct TriggerNode;

#[async_trait]
impl NodeExecutor for TriggerNode {
    async fn execute(
        &self,
        _inputs: &PortMap,
        _config: &PortMap,
        _ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let mut out = PortMap::new();
        out.insert("trigger".into(), json!(true));
        out.insert("startedAt".into(), json!(chrono::Utc::now().to_rfc3339()));
        Ok(out)
    }
}

/// `text-input` — emits its configured text on the `text` port.
pub struct TextInputNode;

#[async_trait]
impl NodeExecutor for TextInputNode {
    async fn execute(
        &self,
        _inputs: &PortMap,
        config: &PortMap,
        _ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let text = config_str(config, "text").unwrap_or_default();
        let mut out = PortMap::new();
        out.insert("text".into(), json!(text));
        Ok(out)
    }
}

/// `debug` — logs whatever arrives and passes it through unchanged.
pub struct DebugNode;

#[async_trait]
impl NodeExecutor for DebugNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let value = input_value(inputs, &["input"]).cloned().unwrap_or(Value::Null);
        let id = node_id(config);

        ctx.log(format!("debug[{id}]: {}", value_to_string(&value)));
        ctx.send_progress(&id, NodeStatus::Output, Some(value.clone()));

        let mut out = PortMap::new();
        out.insert("output".into(), value);
        Ok(out)
    }
}

/// `json-parse` — parses a JSON string and optionally extracts a
/// dot-separated field path.
pub struct JsonParseNode;

#[async_trait]
impl NodeExecutor for JsonParseNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        _ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let raw = input_value(inputs, &["input"])
            .ok_or_else(|| NodeError::Input("json-parse received no input".into()))?;

        let parsed: Value = match raw {
            Value::String(s) => serde_json::from_str(s)
                .map_err(|e| NodeError::Input(format!("invalid JSON: {e}")))?,
            other => other.clone(),
        };

        let extracted = match config_str(config, "field") {
            Some(path) if !path.is_empty() => {
                let mut current = &parsed;
                for segment in path.split('.') {
                    current = match current {
                        Value::Object(map) => map.get(segment).unwrap_or(&Value::Null),
                        Value::Array(items) => segment
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| items.get(i))
                            .unwrap_or(&Value::Null),
                        _ => &Value::Null,
                    };
                }
                current.clone()
            }
            _ => parsed,
        };

        let mut out = PortMap::new();
        out.insert("output".into(), extracted);
        Ok(out)
    }
}

/// `loop` — renders a template once per item of a list, substituting
/// `{item}` and `{index}` placeholders.
pub struct LoopNode;

#[async_trait]
impl NodeExecutor for LoopNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let raw = input_value(inputs, &["items", "input"])
            .ok_or_else(|| NodeError::Input("loop received no items".into()))?;

        let items: Vec<Value> = match raw {
            Value::Array(items) => items.clone(),
            Value::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .and_then(|v| v.as_array().cloned())
                .ok_or_else(|| NodeError::Input("loop input is not a JSON array".into()))?,
            other => vec![other.clone()],
        };

        let template = config_str(config, "template").unwrap_or("{item}");

        let results: Vec<Value> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                json!(template
                    .replace("{item}", &value_to_string(item))
                    .replace("{index}", &index.to_string()))
            })
            .collect();

        ctx.log(format!("loop: rendered {} items", results.len()));

        let mut out = PortMap::new();
        out.insert("count".into(), json!(results.len()));
        out.insert("results".into(), Value::Array(results));
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

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            "wf_test",
            Arc::new(ScriptedLlm::new()),
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
    async fn text_input_emits_configured_text() {
        let out = TextInputNode
            .execute(&PortMap::new(), &map(&[("text", json!("hello"))]), &ctx())
            .await
            .unwrap();
        assert_eq!(out["text"], json!("hello"));
    }

    #[tokio::test]
    async fn debug_logs_and_passes_through() {
        let ctx = ctx();
        let out = DebugNode
            .execute(
                &map(&[("input", json!("4"))]),
                &map(&[(NODE_ID_KEY, json!("debug-1"))]),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(out["output"], json!("4"));
        let logs = ctx.logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].contains("4"));
        assert!(logs[0].contains("debug-1"));
    }

    #[tokio::test]
    async fn json_parse_extracts_nested_fields() {
        let inputs = map(&[("input", json!("{\"user\":{\"name\":\"ada\"}}"))]);
        let config = map(&[("field", json!("user.name"))]);
        let out = JsonParseNode.execute(&inputs, &config, &ctx()).await.unwrap();
        assert_eq!(out["output"], json!("ada"));
    }

    #[tokio::test]
    async fn json_parse_rejects_bad_json() {
        let inputs = map(&[("input", json!("not json"))]);
        let err = JsonParseNode
            .execute(&inputs, &PortMap::new(), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Input(_)));
    }

    #[tokio::test]
    async fn loop_renders_template_per_item() {
        let inputs = map(&[("items", json!(["a", "b"]))]);
        let config = map(&[("template", json!("{index}:{item}"))]);
        let out = LoopNode.execute(&inputs, &config, &ctx()).await.unwrap();

        assert_eq!(out["count"], json!(2));
        assert_eq!(out["results"], json!(["0:a", "1:b"]));
    }
}
