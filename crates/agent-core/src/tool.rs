//! Tool System
//!
//! Capabilities the reasoning engine may request, and the registry that
//! resolves a requested name to a callable. Tools are registered once at
//! startup and only read while turns are running.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Structured tool arguments, keyed by parameter name
pub type Arguments = HashMap<String, Value>;

/// Tool call request from the reasoning engine
///
/// Created at the response parsing boundary and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique per request (engine-assigned or generated)
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    /// Create a call with a freshly generated id
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: generate_call_id(),
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Generate an id for engines that do not assign one
pub fn generate_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Why a tool call produced no value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailureKind {
    UnknownTool,
    InvalidArguments,
    Execution,
    TimedOut,
    Cancelled,
    Panicked,
}

/// Failure details carried inside a [`ToolResult`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ToolFailureKind,
    pub message: String,
}

/// Result from tool execution
///
/// `error` is present iff execution failed; `value` is `Null` in that case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the originating [`ToolCall`]
    pub call_id: String,

    /// Tool that was called
    pub name: String,

    /// Tool-specific payload
    #[serde(default)]
    pub value: Value,

    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl ToolResult {
    pub fn success(call: &ToolCall, value: Value) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            value,
            error: None,
        }
    }

    pub fn failure(call: &ToolCall, kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            value: Value::Null,
            error: Some(ToolFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// JSON payload folded into the transcript: `{"result": ..}` or `{"error": ..}`
    pub fn payload(&self) -> Value {
        match &self.error {
            None => json!({ "result": self.value }),
            Some(failure) => json!({ "error": failure }),
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        match self.param_type.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        }
    }
}

/// Registered capability metadata surfaced to the reasoning engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the engine)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(mut self, param: ParameterSchema) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON Schema object describing `arguments`
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            let mut prop = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if let Some(values) = &param.enum_values {
                prop["enum"] = Value::Array(values.clone());
            }
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.clone(), prop);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Metadata for the reasoning engine
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool with given arguments
    async fn invoke(&self, arguments: &Arguments) -> Result<Value>;

    /// Validate arguments before execution
    fn validate(&self, arguments: &Arguments) -> Result<()> {
        let descriptor = self.descriptor();

        for param in &descriptor.parameters {
            match arguments.get(&param.name) {
                None if param.required => {
                    return Err(AgentError::ToolValidation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                Some(value) if !value.is_null() && !param.accepts(value) => {
                    return Err(AgentError::ToolValidation(format!(
                        "Parameter '{}' must be of type {}",
                        param.name, param.param_type
                    )));
                }
                Some(value) => {
                    if !value.is_null()
                        && let Some(allowed) = &param.enum_values
                        && !allowed.contains(value)
                    {
                        return Err(AgentError::ToolValidation(format!(
                            "Parameter '{}' must be one of {}",
                            param.name,
                            Value::Array(allowed.clone())
                        )));
                    }
                }
                None => {}
            }
        }

        Ok(())
    }
}

/// Registry for available tools
///
/// Descriptors are captured once at registration and kept in registration
/// order, so the engine always sees the same tool list.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let descriptor = tool.descriptor();

        if descriptor.name.trim().is_empty() {
            return Err(AgentError::Config("Tool name must not be empty".into()));
        }
        if self.tools.contains_key(&descriptor.name) {
            return Err(AgentError::DuplicateToolName(descriptor.name));
        }

        tracing::debug!(tool = %descriptor.name, "Registered tool");
        self.tools.insert(descriptor.name.clone(), tool);
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Resolve a tool by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    /// All descriptors, in registration order
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Get tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
