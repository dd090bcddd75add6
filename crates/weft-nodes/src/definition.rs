//! Node-type definitions: the registry's unit of registration.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use weft_core::{NodeCategory, Port, PortMap, ToolSchema};

use crate::{ExecutionContext, NodeError};

/// Behavior of an executable node type.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Runs the node with its resolved inputs and configuration.
    async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError>;
}

/// A node type: identity, ports, configuration schema, and behavior.
/// Tool nodes carry a [`ToolSchema`] instead of an executor.
pub struct NodeTypeDefinition {
    pub id: String,
    pub name: String,
    pub category: NodeCategory,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub config_schema: Value,
    pub tool_schema: Option<ToolSchema>,
    executor: Option<Arc<dyn NodeExecutor>>,
}

impl NodeTypeDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: NodeCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            config_schema: Value::Null,
            tool_schema: None,
            executor: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<Port>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<Port>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_config_schema(mut self, schema: Value) -> Self {
        self.config_schema = schema;
        self
    }

    pub fn with_tool_schema(mut self, schema: ToolSchema) -> Self {
        self.tool_schema = Some(schema);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn NodeExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// True when this definition has an executor. Tool nodes do not.
    pub fn is_executable(&self) -> bool {
        self.executor.is_some()
    }

    /// True when the node type declares an input port with this name.
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|p| p.id == name)
    }

    /// The first declared input port id, if any.
    pub fn first_input(&self) -> Option<&str> {
        self.inputs.first().map(|p| p.id.as_str())
    }

    /// The first declared output port id, if any.
    pub fn first_output(&self) -> Option<&str> {
        self.outputs.first().map(|p| p.id.as_str())
    }

    /// Runs the node. Fails for non-executable (tool) definitions.
    pub async fn execute(
        &self,
        inputs: &PortMap,
        config: &PortMap,
        ctx: &ExecutionContext,
    ) -> Result<PortMap, NodeError> {
        match &self.executor {
            Some(executor) => executor.execute(inputs, config, ctx).await,
            None => Err(NodeError::NotExecutable(self.id.clone())),
        }
    }
}
