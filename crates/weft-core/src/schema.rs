//! Node and tool descriptors shared by the registries.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A declared input or output port on a node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Port {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ty: ty.into(),
        }
    }

    /// Shorthand for a string-typed port whose name matches its id.
    pub fn text(id: &str) -> Self {
        Self::new(id, id, "string")
    }
}

/// Category of a node type, driving palette grouping and engine rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Trigger,
    Ai,
    Data,
    Output,
    Tool,
    #[serde(rename = "plugin-tools")]
    PluginTools,
}

/// MCP-style tool descriptor: name, description, and a JSON-schema
/// object describing the accepted parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Builds an object schema from `(name, type, description)` triples
    /// and the list of required parameter names.
    pub fn object(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[(&str, &str, &str)],
        required: &[&str],
    ) -> Self {
        let mut properties = serde_json::Map::new();
        for (param, ty, desc) in params {
            properties.insert(
                param.to_string(),
                json!({ "type": ty, "description": desc }),
            );
        }
        Self::new(
            name,
            description,
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }

    /// The parameter names listed in the schema's `properties`.
    pub fn parameter_names(&self) -> Vec<String> {
        self.input_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_schema_lists_properties_and_required() {
        let schema = ToolSchema::object(
            "calculator",
            "Evaluates arithmetic",
            &[("expression", "string", "The expression to evaluate")],
            &["expression"],
        );
        assert_eq!(schema.input_schema["type"], "object");
        assert_eq!(schema.input_schema["required"][0], "expression");
        assert_eq!(schema.parameter_names(), vec!["expression"]);
    }

    #[test]
    fn plugin_tools_category_serializes_with_dash() {
        let json = serde_json::to_string(&NodeCategory::PluginTools).unwrap();
        assert_eq!(json, "\"plugin-tools\"");
    }
}
