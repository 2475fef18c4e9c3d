//! Tool domain entities

use crate::core::caller::CallerId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the argument that carries the caller identity on the wire.
pub const CALLER_FIELD: &str = "caller";

/// Public description of a registered tool, as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "create_event")
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Parse the `{"tools": [...]}` payload of a `tools/list` result.
    pub fn list_from_value(value: &Value) -> Result<Vec<ToolDefinition>, String> {
        let tools = value
            .get("tools")
            .cloned()
            .ok_or_else(|| "tools/list result must include 'tools'".to_string())?;
        serde_json::from_value(tools).map_err(|e| format!("invalid tools/list result: {}", e))
    }
}

/// A tool invocation issued by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub tool_name: String,
    /// Who is asking
    pub caller: CallerId,
    /// Tool-specific arguments (without the caller field)
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, caller: CallerId) -> Self {
        Self {
            tool_name: tool_name.into(),
            caller,
            arguments: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    /// Arguments as sent on the wire: the call's arguments plus `caller`.
    ///
    /// The invoking identity always wins over a `caller` key in the arguments.
    pub fn wire_arguments(&self) -> Map<String, Value> {
        let mut arguments = self.arguments.clone();
        arguments.insert(
            CALLER_FIELD.to_string(),
            Value::String(self.caller.as_str().to_string()),
        );
        arguments
    }
}
