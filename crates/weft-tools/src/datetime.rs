use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::{json, Value};

use crate::{Tool, ToolError};

/// Datetime tool - reports the current date and time.
pub struct DatetimeTool;

#[async_trait]
impl Tool for DatetimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Get the current date and time."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "Output format",
                    "enum": ["iso", "unix", "human"]
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let format = args.get("format").and_then(Value::as_str).unwrap_or("iso");
        let now_utc = Utc::now();
        let now_local = Local::now();

        let rendered = match format {
            "iso" => json!(now_utc.to_rfc3339()),
            "unix" => json!(now_utc.timestamp()),
            "human" => json!(now_local.format("%A, %B %e %Y, %H:%M:%S").to_string()),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "unknown format '{other}'"
                )))
            }
        };

        Ok(json!({ "now": rendered, "timezone": now_local.offset().to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_to_iso() {
        let result = DatetimeTool.execute(json!({})).await.unwrap();
        let iso = result["now"].as_str().unwrap();
        assert!(iso.contains('T'));
    }

    #[tokio::test]
    async fn unix_format_is_numeric() {
        let result = DatetimeTool
            .execute(json!({ "format": "unix" }))
            .await
            .unwrap();
        assert!(result["now"].is_i64());
    }

    #[tokio::test]
    async fn rejects_unknown_format() {
        let err = DatetimeTool
            .execute(json!({ "format": "stardate" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
