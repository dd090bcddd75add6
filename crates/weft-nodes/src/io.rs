//! I/O node executors, delegating to the corresponding built-in tools
//! so nodes and orchestrators share one implementation per concern.

use async_trait::async_trait;
use serde_json::{json, Value};

use weft_core::PortMap;
use weft_tools::{HttpRequestTool, ReadFileTool, Tool, WriteFileTool};

use crate::basic::{config_str, input_value, value_to_string};
use crate::{ExecutionContext, NodeError, NodeExecutor};

/// `http-request` — fetches a URL from config or input.
pub struct HttpRequestNode {
    tool: HttpRequestTool,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self {
            tool: HttpRequestTool::new(),
        }
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for HttpRequestNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let url = input_value(inputs, &["url"])
            .and_then(Value::as_str)
            .or_else(|| config_str(config, "url"))
            .ok_or_else(|| NodeError::Config("http-request needs a url".into()))?
            .to_string();
        let method = config_str(config, "method").unwrap_or("GET");

        let mut args = json!({ "url": url, "method": method });
        if let Some(body) = input_value(inputs, &["body", "input"]) {
            args["body"] = json!(value_to_string(body));
        }

        ctx.log(format!("http-request: {method} {url}"));
        let result = self.tool.execute(args).await?;

        let mut out = PortMap::new();
        out.insert("response".into(), result);
        Ok(out)
    }
}

/// `file-read` — reads a local file into the `content` port.
pub struct FileReadNode;

#[async_trait]
impl NodeExecutor for FileReadNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let path = input_value(inputs, &["path", "input"])
            .and_then(Value::as_str)
            .or_else(|| config_str(config, "path"))
            .ok_or_else(|| NodeError::Config("file-read needs a path".into()))?
            .to_string();

        ctx.log(format!("file-read: {path}"));
        let result = ReadFileTool.execute(json!({ "path": path })).await?;

        let mut out = PortMap::new();
        out.insert("content".into(), result["content"].clone());
        Ok(out)
    }
}

/// `file-write` — writes incoming content to a local file.
pub struct FileWriteNode;

#[async_trait]
impl NodeExecutor for FileWriteNode {
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        let path = input_value(inputs, &["path"])
            .and_then(Value::as_str)
            .or_else(|| config_str(config, "path"))
            .ok_or_else(|| NodeError::Config("file-write needs a path".into()))?
            .to_string();
        let content = input_value(inputs, &["content", "input", "text"])
            .map(value_to_string)
            .unwrap_or_default();

        ctx.log(format!("file-write: {} bytes to {path}", content.len()));
        let result = WriteFileTool
            .execute(json!({ "path": path, "content": content }))
            .await?;

        let mut out = PortMap::new();
        out.insert("written".into(), json!(true));
        out.insert("path".into(), json!(path));
        out.insert("bytes".into(), result["bytes"].clone());
        Ok(out)
    }
}
