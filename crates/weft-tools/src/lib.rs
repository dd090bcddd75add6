//! Tool abstraction and registry for weft orchestrators.
//!
//! - [`Tool`] — trait for implementing callable tools
//! - [`ToolRegistry`] — process-wide catalog with hot registration
//! - Built-ins: [`CalculatorTool`], [`DatetimeTool`], [`HttpRequestTool`],
//!   [`ReadFileTool`], [`WriteFileTool`]
//!
//! # Implementing a custom tool
//!
//! ```rust,ignore
//! use weft_tools::{Tool, ToolError};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! struct EchoTool;
//!
//! #[async_trait]
//! impl Tool for EchoTool {
//!     fn name(&self) -> &str { "echo" }
//!     fn description(&self) -> &str { "Returns its input" }
//!     fn parameters(&self) -> Value {
//!         json!({
//!             "type": "object",
//!             "properties": { "text": { "type": "string" } },
//!             "required": ["text"]
//!         })
//!     }
//!     async fn execute(&self, args: Value) -> Result<Value, ToolError> {
//!         Ok(args)
//!     }
//! }
//! ```

mod calculator;
mod datetime;
mod file;
mod http;

pub use calculator::CalculatorTool;
pub use datetime::DatetimeTool;
pub use file::{ReadFileTool, WriteFileTool};
pub use http::HttpRequestTool;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use weft_core::ToolSchema;

/// Errors that can occur during tool execution.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool execution failed with a message.
    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),

    /// Invalid arguments were passed to the tool.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Network request failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Requested tool was not found in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),
}

/// A named, schema-described callable available to orchestrators.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of this tool.
    fn name(&self) -> &str;

    /// What this tool does, phrased for the model.
    fn description(&self) -> &str;

    /// JSON-schema object describing the accepted parameters.
    fn parameters(&self) -> Value;

    /// Executes the tool with the given arguments.
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    /// The schema record shared with tool nodes and the plugin loader.
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description(), self.parameters())
    }
}

/// Process-wide catalog of tools. Registration replaces any existing
/// entry with the same name; readers clone the `Arc` out of the lock,
/// so a registry snapshot taken mid-run stays valid.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry pre-loaded with the built-in tools.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(CalculatorTool);
        registry.register(DatetimeTool);
        registry.register(HttpRequestTool::new());
        registry.register(ReadFileTool);
        registry.register(WriteFileTool);
        registry
    }

    /// Registers a tool, replacing any existing entry with the same name.
    pub fn register<T: Tool + 'static>(&self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Registers an already-shared tool.
    pub fn register_arc(&self, tool: Arc<dyn Tool>) {
        self.tools
            .write()
            .expect("tool registry lock")
            .insert(tool.name().to_string(), tool);
    }

    /// Gets a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().expect("tool registry lock").get(name).cloned()
    }

    /// Returns true if a tool with the given name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.read().expect("tool registry lock").contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.read().expect("tool registry lock").len()
    }

    /// True when no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The names of all registered tools, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .read()
            .expect("tool registry lock")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Schemas of all registered tools, sorted by name.
    pub fn list(&self) -> Vec<ToolSchema> {
        let guard = self.tools.read().expect("tool registry lock");
        let mut schemas: Vec<ToolSchema> = guard.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Renders the prompt fragment enumerating the named tools, in the
    /// format the orchestrator's system prompt embeds:
    ///
    /// ```text
    /// • calculator: Evaluates arithmetic expressions
    ///   Parameters:
    ///     expression: The expression to evaluate
    /// ```
    pub fn descriptions_for_prompt(&self, names: &[String]) -> String {
        let mut out = String::new();
        for name in names {
            let Some(tool) = self.get(name) else { continue };
            out.push_str(&format!("• {}: {}\n", tool.name(), tool.description()));
            let params = tool.parameters();
            let Some(props) = params.get("properties").and_then(Value::as_object) else {
                continue;
            };
            if props.is_empty() {
                continue;
            }
            out.push_str("  Parameters:\n");
            for (param, schema) in props {
                let detail = schema
                    .get("description")
                    .and_then(Value::as_str)
                    .or_else(|| schema.get("type").and_then(Value::as_str))
                    .unwrap_or("value");
                out.push_str(&format!("    {param}: {detail}\n"));
            }
        }
        out
    }
}

/// Extracts a required string argument from a tool's args object.
pub fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing '{key}' parameter")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NamedTool(&'static str, &'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            self.1
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": {}, "required": [] })
        }
        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            Ok(json!(self.1))
        }
    }

    #[test]
    fn registration_is_idempotent_per_name() {
        let registry = ToolRegistry::new();
        registry.register(NamedTool("dup", "first"));
        registry.register(NamedTool("dup", "second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().description(), "second");
    }

    #[test]
    fn prompt_fragment_lists_parameters() {
        let registry = ToolRegistry::with_defaults();
        let fragment = registry.descriptions_for_prompt(&["calculator".to_string()]);

        assert!(fragment.starts_with("• calculator:"));
        assert!(fragment.contains("  Parameters:\n"));
        assert!(fragment.contains("    expression:"));
    }

    #[test]
    fn unknown_names_are_skipped_in_prompt_fragment() {
        let registry = ToolRegistry::new();
        let fragment = registry.descriptions_for_prompt(&["nope".to_string()]);
        assert!(fragment.is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let registry = ToolRegistry::new();
        registry.register(NamedTool("zeta", ""));
        registry.register(NamedTool("alpha", ""));
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
