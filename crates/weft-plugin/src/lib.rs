//! Plugin loading for weft.
//!
//! A plugin is a directory holding a `manifest.json` plus one
//! executable per declared tool. For every tool the loader registers:
//!
//! - a [`weft_tools::Tool`] backed by the tool executable (parameters
//!   arrive as JSON on stdin, the result leaves as JSON on stdout), and
//! - a `plugin-tools` node definition sharing the same input schema,
//!   so the tool is discoverable on the canvas and attachable to
//!   orchestrators.
//!
//! # Manifest
//!
//! ```json
//! {
//!   "id": "weather",
//!   "name": "Weather",
//!   "version": "0.1.0",
//!   "tools": [{
//!     "id": "weather_lookup",
//!     "name": "Weather Lookup",
//!     "description": "Current weather for a city",
//!     "file": "lookup.sh",
//!     "inputs": { "city": { "type": "string", "description": "City name" } },
//!     "required": ["city"]
//!   }]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use weft_core::{NodeCategory, ToolSchema};
use weft_nodes::{NodeRegistry, NodeTypeDefinition};
use weft_tools::{Tool, ToolError, ToolRegistry};

const TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while loading plugins.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plugin manifest '{path}': {source}")]
    Manifest {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A plugin's `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tools: Vec<PluginToolDecl>,
}

/// One tool declared by a plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginToolDecl {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Executable, relative to the plugin directory.
    pub file: String,
    /// Parameter declarations: property name to JSON-schema fragment.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
    /// Static configuration forwarded to every invocation.
    #[serde(default)]
    pub config: Option<Value>,
}

impl PluginToolDecl {
    /// The JSON-schema object shared by the tool and its node.
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.inputs.clone(),
            "required": self.required.clone(),
        })
    }
}

/// A tool backed by a plugin executable. The child receives
/// `{"params": ..., "config": ...}` on stdin and must print its result
/// to stdout; a JSON line is passed through, anything else is wrapped
/// as `{"output": <text>}`.
pub struct PluginTool {
    name: String,
    description: String,
    input_schema: Value,
    program: PathBuf,
    config: Option<Value>,
}

impl PluginTool {
    fn new(plugin_dir: &Path, decl: &PluginToolDecl) -> Self {
        Self {
            name: decl.id.clone(),
            description: decl.description.clone(),
            input_schema: decl.input_schema(),
            program: plugin_dir.join(&decl.file),
            config: decl.config.clone(),
        }
    }
}

#[async_trait]
impl Tool for PluginTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let payload = json!({
            "params": args,
            "config": self.config.clone().unwrap_or(Value::Null),
        });

        let mut child = Command::new(&self.program)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                ToolError::ExecutionFailed(format!(
                    "cannot start plugin tool '{}': {e}",
                    self.program.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let body = payload.to_string();
            stdin
                .write_all(body.as_bytes())
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("plugin stdin failed: {e}")))?;
        }

        let output = tokio::time::timeout(TOOL_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| ToolError::ExecutionFailed(format!("plugin tool '{}' timed out", self.name)))?
            .map_err(|e| ToolError::ExecutionFailed(format!("plugin tool failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::ExecutionFailed(format!(
                "plugin tool '{}' exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        Ok(serde_json::from_str(text).unwrap_or_else(|_| json!({ "output": text })))
    }
}

/// Loads every plugin under `dir`, registering each declared tool in
/// the tool registry and as a `plugin-tools` node type. Returns the
/// manifests of the plugins that loaded; broken plugins are logged and
/// skipped.
pub fn load_plugins(
    dir: &Path,
    tools: &ToolRegistry,
    nodes: &NodeRegistry,
) -> Result<Vec<PluginManifest>, PluginError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| PluginError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut manifests = Vec::new();
    for entry in entries.flatten() {
        let plugin_dir = entry.path();
        let manifest_path = plugin_dir.join("manifest.json");
        if !manifest_path.is_file() {
            continue;
        }

        let manifest = match read_manifest(&manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Skipping plugin {}: {e}", plugin_dir.display());
                continue;
            }
        };

        for decl in &manifest.tools {
            register_plugin_tool(&plugin_dir, decl, tools, nodes);
        }

        info!(
            "Loaded plugin '{}' v{} ({} tools)",
            manifest.name,
            manifest.version,
            manifest.tools.len()
        );
        manifests.push(manifest);
    }

    Ok(manifests)
}

fn read_manifest(path: &Path) -> Result<PluginManifest, PluginError> {
    let content = std::fs::read_to_string(path).map_err(|e| PluginError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| PluginError::Manifest {
        path: path.display().to_string(),
        source: e,
    })
}

/// Registers one plugin tool both as a callable tool and as a
/// `plugin-tools` node sharing the same input schema.
fn register_plugin_tool(
    plugin_dir: &Path,
    decl: &PluginToolDecl,
    tools: &ToolRegistry,
    nodes: &NodeRegistry,
) {
    let tool = PluginTool::new(plugin_dir, decl);
    let schema = ToolSchema::new(decl.id.clone(), decl.description.clone(), decl.input_schema());
    tools.register(tool);

    nodes.register(
        NodeTypeDefinition::new(decl.id.clone(), decl.name.clone(), NodeCategory::PluginTools)
            .with_config_schema(decl.input_schema())
            .with_tool_schema(schema),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_plugin(root: &Path, id: &str) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        let manifest = json!({
            "id": id,
            "name": "Echo Plugin",
            "version": "0.1.0",
            "tools": [{
                "id": format!("{id}_echo"),
                "name": "Echo",
                "description": "Echoes its input",
                "file": "echo.sh",
                "inputs": { "text": { "type": "string", "description": "Text to echo" } },
                "required": ["text"]
            }]
        });
        std::fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
        std::fs::write(dir.join("echo.sh"), "#!/bin/sh\ncat\n").unwrap();
    }

    #[test]
    fn loads_manifests_and_registers_tools_and_nodes() {
        let root = tempfile::tempdir().unwrap();
        write_plugin(root.path(), "demo");

        let tools = ToolRegistry::new();
        let nodes = NodeRegistry::new();
        let manifests = load_plugins(root.path(), &tools, &nodes).unwrap();

        assert_eq!(manifests.len(), 1);
        assert!(tools.has("demo_echo"));

        let node = nodes.get("demo_echo").unwrap();
        assert_eq!(node.category, NodeCategory::PluginTools);
        assert!(!node.is_executable());
        let schema = node.tool_schema.as_ref().unwrap();
        assert_eq!(schema.name, "demo_echo");
        assert_eq!(schema.input_schema["required"][0], "text");
    }

    #[test]
    fn missing_plugin_dir_is_empty_not_fatal() {
        let tools = ToolRegistry::new();
        let nodes = NodeRegistry::new();
        let manifests =
            load_plugins(Path::new("/nonexistent/weft-plugins"), &tools, &nodes).unwrap();
        assert!(manifests.is_empty());
    }

    #[test]
    fn malformed_manifest_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("manifest.json"), "{not json").unwrap();
        write_plugin(root.path(), "fine");

        let tools = ToolRegistry::new();
        let nodes = NodeRegistry::new();
        let manifests = load_plugins(root.path(), &tools, &nodes).unwrap();

        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].id, "fine");
    }
}
