use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{require_str, Tool, ToolError};

/// HTTP request tool - fetches a URL and returns the response body,
/// reduced to readable text when the server sends HTML.
pub struct HttpRequestTool {
    client: reqwest::Client,
}

impl HttpRequestTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; WeftBot/1.0)")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        Self::new()
    }
}

const MAX_BODY_CHARS: usize = 8000;

#[derive(Debug, Serialize)]
struct HttpResult {
    url: String,
    status: u16,
    content_type: String,
    body: String,
    truncated: bool,
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request. Returns status and body; HTML bodies are converted to readable text."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to request"
                },
                "method": {
                    "type": "string",
                    "description": "HTTP method (default: GET)",
                    "enum": ["GET", "POST", "PUT", "DELETE"]
                },
                "body": {
                    "type": "string",
                    "description": "Request body for POST/PUT, sent as JSON when it parses"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let url = require_str(&args, "url")?;
        let method = args
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();

        let mut request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "unsupported method '{other}'"
                )))
            }
        };

        if let Some(body) = args.get("body").and_then(Value::as_str) {
            request = match serde_json::from_str::<Value>(body) {
                Ok(parsed) => request.json(&parsed),
                Err(_) => request.body(body.to_string()),
            };
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/plain")
            .to_string();

        let raw = response.text().await?;
        let text = if content_type.contains("text/html") {
            html2text::from_read(raw.as_bytes(), 80)
        } else {
            raw
        };

        let truncated = text.chars().count() > MAX_BODY_CHARS;
        let body: String = text.chars().take(MAX_BODY_CHARS).collect();

        let result = HttpResult {
            url: url.to_string(),
            status,
            content_type,
            body,
            truncated,
        };
        serde_json::to_value(result)
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to serialize response: {e}")))
    }
}
