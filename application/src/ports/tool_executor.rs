//! Tool Executor port
//!
//! Defines the interface the dispatcher uses to reach registered tools.

use async_trait::async_trait;
use serde_json::{Map, Value};
use toolgate_domain::{ToolDefinition, ToolError};

/// Port for tool execution
///
/// This port defines how the application layer executes tools.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Definitions of all registered tools, sorted by name
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Check if a tool is registered
    fn has_tool(&self, name: &str) -> bool;

    /// Execute a registered tool
    async fn execute(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, ToolError>;
}
