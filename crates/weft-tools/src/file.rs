use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::{require_str, Tool, ToolError};

/// Read file tool - returns the contents of a local text file.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file from the local filesystem."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let path = require_str(&args, "path")?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("cannot read '{path}': {e}")))?;
        Ok(json!({ "path": path, "content": content }))
    }
}

/// Write file tool - writes text content to a local file, creating
/// parent directories as needed.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file on the local filesystem."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Text content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let path = require_str(&args, "path")?;
        let content = require_str(&args, "content")?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ToolError::ExecutionFailed(format!("cannot create '{}': {e}", parent.display())))?;
            }
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("cannot write '{path}': {e}")))?;

        info!("Wrote {} bytes to {}", content.len(), path);
        Ok(json!({ "path": path, "bytes": content.len() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path_str = path.to_str().unwrap();

        WriteFileTool
            .execute(json!({ "path": path_str, "content": "hello" }))
            .await
            .unwrap();
        let result = ReadFileTool
            .execute(json!({ "path": path_str }))
            .await
            .unwrap();

        assert_eq!(result["content"], json!("hello"));
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let err = ReadFileTool
            .execute(json!({ "path": "/nonexistent/weft-test" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }
}
