//! Tool handler port
//!
//! A [`ToolHandler`] is the implementation behind one registered tool. Handlers
//! are async; synchronous closures are adapted with [`handler_fn`], async ones
//! with [`async_handler_fn`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use toolgate_domain::ToolError;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. `arguments` includes the `caller` field.
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolError>;
}

/// Adapter for synchronous closures.
pub struct FnHandler<F>(F);

/// Wrap a synchronous closure as a [`ToolHandler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Result<Value, ToolError> + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Result<Value, ToolError> + Send + Sync,
{
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        (self.0)(arguments)
    }
}

/// Adapter for closures returning a future.
pub struct AsyncFnHandler<F>(F);

/// Wrap an async closure as a [`ToolHandler`].
pub fn async_handler_fn<F, Fut>(f: F) -> AsyncFnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    AsyncFnHandler(f)
}

#[async_trait]
impl<F, Fut> ToolHandler for AsyncFnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        (self.0)(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sync_and_async_closures() {
        let echo = handler_fn(|args| Ok(Value::Object(args)));
        let mut args = Map::new();
        args.insert("q".into(), json!("tokio"));
        assert_eq!(echo.call(args.clone()).await.unwrap()["q"], "tokio");

        let failing = async_handler_fn(|_args| async { Err(ToolError::new("no credentials")) });
        assert_eq!(
            failing.call(args).await.unwrap_err().to_string(),
            "no credentials"
        );
    }
}
