//! Tool Registry
//!
//! The [`ToolRegistry`] maps tool names to handlers and implements
//! [`ToolExecutorPort`], which is all the dispatcher needs from it.
//!
//! # Usage
//!
//! ```ignore
//! use toolgate_application::handler_fn;
//! use toolgate_infrastructure::tools::ToolRegistry;
//!
//! let registry = ToolRegistry::new()
//!     .register("search_docs", "Search documentation", handler_fn(search))
//!     .register("create_event", "Create a calendar event", handler_fn(create));
//!
//! assert!(registry.has_tool("search_docs"));
//! ```
//!
//! Registering a name twice replaces the earlier handler.

use crate::config::FileToolConfig;
use crate::tools::command::CommandTool;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use toolgate_application::ports::tool_executor::ToolExecutorPort;
use toolgate_application::ports::tool_handler::ToolHandler;
use toolgate_domain::{ToolDefinition, ToolError};
use tracing::{debug, warn};

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

/// Name-keyed set of tool handlers.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler
    pub fn register<H: ToolHandler + 'static>(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: H,
    ) -> Self {
        self.register_arc(name, description, Arc::new(handler))
    }

    /// Register a tool handler (Arc version)
    pub fn register_arc(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        let definition = ToolDefinition::new(name, description);
        let name = definition.name.clone();
        if self.tools.contains_key(&name) {
            warn!(tool = name.as_str(), "Replacing previously registered tool");
        }
        self.tools.insert(
            name,
            RegisteredTool {
                definition,
                handler,
            },
        );
        self
    }

    /// Build a registry of command-backed tools from `[server.tools]`.
    pub fn from_config<'a, I>(configs: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a FileToolConfig)>,
    {
        configs
            .into_iter()
            .fold(Self::new(), |registry, (name, config)| {
                debug!(tool = name.as_str(), command = config.command.as_str(), "Registering command tool");
                registry.register(
                    name.as_str(),
                    config.description.as_str(),
                    CommandTool::new(name.as_str(), config.command.as_str())
                        .with_timeout(Duration::from_millis(config.timeout_ms)),
                )
            })
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    async fn execute(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::new(format!("Unknown tool: {}", name)))?;
        tool.handler.call(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolgate_application::handler_fn;

    #[tokio::test]
    async fn test_register_and_execute() {
        let registry = ToolRegistry::new()
            .register(
                "search_docs",
                "Search documentation",
                handler_fn(|args| Ok(json!({ "query": args["query"] }))),
            )
            .register(
                "create_event",
                "Create a calendar event",
                handler_fn(|_| Ok(json!("created"))),
            );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["create_event", "search_docs"]);
        assert!(registry.has_tool("search_docs"));
        assert!(!registry.has_tool("delete_event"));

        let mut args = Map::new();
        args.insert("query".to_string(), json!("tokio"));
        let result = registry.execute("search_docs", args).await.unwrap();
        assert_eq!(result["query"], "tokio");
    }

    #[tokio::test]
    async fn test_duplicate_name_replaces_handler() {
        let registry = ToolRegistry::new()
            .register("echo", "first", handler_fn(|_| Ok(json!(1))))
            .register("echo", "second", handler_fn(|_| Ok(json!(2))));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].description, "second");
        assert_eq!(registry.execute("echo", Map::new()).await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        let err = registry.execute("missing", Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: missing");
    }

    #[test]
    fn test_from_config() {
        let mut configs = BTreeMap::new();
        configs.insert(
            "search_docs".to_string(),
            FileToolConfig {
                description: "Search docs".to_string(),
                command: "cat".to_string(),
                timeout_ms: 1000,
            },
        );

        let registry = ToolRegistry::from_config(&configs);
        assert_eq!(
            registry.definitions(),
            vec![ToolDefinition::new("search_docs", "Search docs")]
        );
    }
}
