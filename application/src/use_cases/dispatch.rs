//! Dispatch use case - the server side of the tool protocol.
//!
//! [`RequestDispatcher`] turns one decoded [`Request`] into exactly one
//! [`Response`]. Methods are routed through a table built at construction;
//! `tools/call` is authorized against the [`CapabilityAllowlist`] before the
//! registry is consulted, so an unlisted caller can neither run a tool nor
//! learn whether it exists.

use crate::ports::tool_executor::ToolExecutorPort;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use toolgate_domain::{
    AuthorizationError, CALLER_FIELD, CallerId, CapabilityAllowlist, ErrorCode, Method,
    PROTOCOL_VERSION, Request, Response, ResponseError, ToolError, decode_request,
    encode_response,
};
use tracing::{debug, warn};

/// Identity reported in the `initialize` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "toolgate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

/// Errors that can occur while handling a request.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::Authorization(AuthorizationError::MissingCaller) => {
                ErrorCode::MissingCaller
            }
            DispatchError::Authorization(AuthorizationError::NotGranted { .. }) => {
                ErrorCode::Unauthorized
            }
            DispatchError::UnknownTool(_) => ErrorCode::UnknownTool,
            DispatchError::InvalidParams(_) => ErrorCode::InvalidParams,
            DispatchError::Tool(_) => ErrorCode::ToolError,
        }
    }
}

type Route = for<'a> fn(
    &'a RequestDispatcher,
    Map<String, Value>,
) -> BoxFuture<'a, Result<Value, DispatchError>>;

fn route_initialize<'a>(
    dispatcher: &'a RequestDispatcher,
    params: Map<String, Value>,
) -> BoxFuture<'a, Result<Value, DispatchError>> {
    futures::future::ready(Ok(dispatcher.initialize(&params))).boxed()
}

fn route_tools_list<'a>(
    dispatcher: &'a RequestDispatcher,
    _params: Map<String, Value>,
) -> BoxFuture<'a, Result<Value, DispatchError>> {
    futures::future::ready(Ok(dispatcher.tools_list())).boxed()
}

fn route_tools_call<'a>(
    dispatcher: &'a RequestDispatcher,
    params: Map<String, Value>,
) -> BoxFuture<'a, Result<Value, DispatchError>> {
    dispatcher.tools_call(params).boxed()
}

/// Routes requests to the registry, enforcing the allowlist.
pub struct RequestDispatcher {
    executor: Arc<dyn ToolExecutorPort>,
    allowlist: Arc<CapabilityAllowlist>,
    info: ServerInfo,
    routes: HashMap<Method, Route>,
}

impl RequestDispatcher {
    pub fn new(executor: Arc<dyn ToolExecutorPort>, allowlist: Arc<CapabilityAllowlist>) -> Self {
        let mut routes: HashMap<Method, Route> = HashMap::new();
        routes.insert(Method::Initialize, route_initialize as Route);
        routes.insert(Method::ToolsList, route_tools_list as Route);
        routes.insert(Method::ToolsCall, route_tools_call as Route);

        Self {
            executor,
            allowlist,
            info: ServerInfo::default(),
            routes,
        }
    }

    pub fn with_server_info(mut self, info: ServerInfo) -> Self {
        self.info = info;
        self
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.info
    }

    /// Handle one raw line. Blank lines yield `None`; everything else yields
    /// exactly one encoded response line.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        self.respond_to_line(line)
            .await
            .map(|response| encode_response(&response))
    }

    /// Like [`handle_line`](Self::handle_line), but returns the response unencoded.
    pub async fn respond_to_line(&self, line: &str) -> Option<Response> {
        if line.trim().is_empty() {
            return None;
        }
        let response = match decode_request(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                debug!("Rejecting request line: {}", e);
                e.to_response()
            }
        };
        Some(response)
    }

    pub async fn handle(&self, request: Request) -> Response {
        let Request { id, method, params } = request;

        let Some(route) = self.routes.get(&method) else {
            return Response::failure(
                id,
                ResponseError::new(
                    ErrorCode::MethodNotFound,
                    format!("unsupported method '{}'", method),
                ),
            );
        };

        match route(self, params).await {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                let code = e.code();
                if code == ErrorCode::ToolError {
                    debug!(method = method.as_str(), "Tool raised: {}", e);
                } else {
                    debug!(method = method.as_str(), code = code.as_str(), "Request rejected: {}", e);
                }
                Response::failure(id, ResponseError::new(code, e.to_string()))
            }
        }
    }

    fn initialize(&self, params: &Map<String, Value>) -> Value {
        if let Some(client) = params.get("clientInfo") {
            debug!(client = %client, "initialize");
        }
        json!({
            "protocolVersion": self.info.protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version,
            },
        })
    }

    fn tools_list(&self) -> Value {
        let mut definitions = self.executor.definitions();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        let tools: Vec<Value> = definitions
            .iter()
            .map(|d| json!({ "name": d.name, "description": d.description }))
            .collect();
        json!({ "tools": tools })
    }

    async fn tools_call(&self, mut params: Map<String, Value>) -> Result<Value, DispatchError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DispatchError::InvalidParams("tools/call requires a non-empty 'name'".to_string())
            })?;

        let arguments = match params.remove("arguments") {
            Some(Value::Object(arguments)) => arguments,
            None | Some(Value::Null) => Map::new(),
            Some(_) => {
                return Err(DispatchError::InvalidParams(
                    "tools/call 'arguments' must be an object".to_string(),
                ));
            }
        };

        let caller = arguments
            .get(CALLER_FIELD)
            .and_then(Value::as_str)
            .and_then(CallerId::new);

        if let Err(e) = self.allowlist.authorize(caller.as_ref(), &name) {
            warn!(
                tool = %name,
                caller = caller.as_ref().map(CallerId::as_str),
                "Denied tool invocation: {}",
                e
            );
            return Err(e.into());
        }

        if !self.executor.has_tool(&name) {
            return Err(DispatchError::UnknownTool(name));
        }

        debug!(tool = %name, caller = caller.as_ref().map(CallerId::as_str), "Executing tool");
        Ok(self.executor.execute(&name, arguments).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_handler::handler_fn;
    use crate::testing::MapExecutor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolgate_domain::{RequestId, decode_response};

    fn dispatcher(counter: Arc<AtomicUsize>) -> RequestDispatcher {
        let executor = MapExecutor::new()
            .with_tool(
                "create_event",
                "Create a calendar event",
                handler_fn(move |args| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({ "link": "https://calendar.example/evt/1", "summary": args["summary"] }))
                }),
            )
            .with_tool(
                "search_docs",
                "Search documentation",
                handler_fn(|_| Err(ToolError::new("Missing Google credentials. Use /connect_google."))),
            );
        let allowlist = CapabilityAllowlist::new()
            .grant(CallerId::new("personal").unwrap(), ["create_event"])
            .grant(CallerId::new("command").unwrap(), ["search_docs", "ghost_tool"]);
        RequestDispatcher::new(Arc::new(executor), Arc::new(allowlist))
    }

    fn call(caller: Option<&str>, tool: &str) -> Request {
        let mut arguments = Map::new();
        arguments.insert("summary".into(), json!("Sync"));
        if let Some(caller) = caller {
            arguments.insert("caller".into(), json!(caller));
        }
        let mut params = Map::new();
        params.insert("name".into(), json!(tool));
        params.insert("arguments".into(), Value::Object(arguments));
        Request::new(1, Method::ToolsCall, params)
    }

    fn error_code(response: &Response) -> Option<ErrorCode> {
        response.outcome.as_ref().err().and_then(|e| e.code)
    }

    #[tokio::test]
    async fn test_granted_call_executes_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(counter.clone());

        let response = d.handle(call(Some("personal"), "create_event")).await;
        let result = response.outcome.unwrap();
        assert_eq!(result["link"], "https://calendar.example/evt/1");
        assert_eq!(result["summary"], "Sync");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_caller_never_executes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(counter.clone());

        let response = d.handle(call(Some("command"), "create_event")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::Unauthorized));
        assert_eq!(
            response.outcome.unwrap_err().message,
            "Caller 'command' is not allowed to use tool 'create_event'"
        );
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_caller_rejected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(counter.clone());

        let response = d.handle(call(None, "create_event")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::MissingCaller));
        assert_eq!(
            response.outcome.unwrap_err().message,
            "Missing 'caller' for tool invocation"
        );

        let response = d.handle(call(Some("  "), "create_event")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::MissingCaller));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authorization_runs_before_registry_lookup() {
        let d = dispatcher(Arc::new(AtomicUsize::new(0)));

        // Ungranted and unregistered: the caller learns nothing about the registry.
        let response = d.handle(call(Some("personal"), "no_such_tool")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::Unauthorized));

        // Granted but unregistered.
        let response = d.handle(call(Some("command"), "ghost_tool")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::UnknownTool));
    }

    #[tokio::test]
    async fn test_tool_error_passes_through_verbatim() {
        let d = dispatcher(Arc::new(AtomicUsize::new(0)));
        let response = d.handle(call(Some("command"), "search_docs")).await;
        let error = response.outcome.unwrap_err();
        assert_eq!(error.code, Some(ErrorCode::ToolError));
        assert_eq!(error.message, "Missing Google credentials. Use /connect_google.");
    }

    #[tokio::test]
    async fn test_tools_list_sorted_without_authorization() {
        let d = dispatcher(Arc::new(AtomicUsize::new(0)));
        let response = d
            .handle(Request::new(2, Method::ToolsList, Map::new()))
            .await;
        let result = response.outcome.unwrap();
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["create_event", "search_docs"]);
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let d = dispatcher(Arc::new(AtomicUsize::new(0)));
        let response = d
            .handle(Request::new(0, Method::Initialize, Map::new()))
            .await;
        let result = response.outcome.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "toolgate");
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let d = dispatcher(Arc::new(AtomicUsize::new(0)));

        let response = d.handle(Request::new(3, Method::ToolsCall, Map::new())).await;
        assert_eq!(error_code(&response), Some(ErrorCode::InvalidParams));

        let mut params = Map::new();
        params.insert("name".into(), json!("create_event"));
        params.insert("arguments".into(), json!("caller=personal"));
        let response = d.handle(Request::new(4, Method::ToolsCall, params)).await;
        assert_eq!(error_code(&response), Some(ErrorCode::InvalidParams));
    }

    #[tokio::test]
    async fn test_handle_line() {
        let d = dispatcher(Arc::new(AtomicUsize::new(0)));

        assert!(d.handle_line("   ").await.is_none());

        let line = d.handle_line("{not json").await.unwrap();
        let response = decode_response(&line).unwrap();
        assert_eq!(response.id, RequestId::null());
        assert_eq!(error_code(&response), Some(ErrorCode::MalformedRequest));

        let line = d
            .handle_line(r#"{"id": "abc", "method": "resources/list"}"#)
            .await
            .unwrap();
        let response = decode_response(&line).unwrap();
        assert_eq!(response.id, RequestId::new(json!("abc")));
        assert_eq!(error_code(&response), Some(ErrorCode::MethodNotFound));

        let line = d
            .handle_line(r#"{"jsonrpc": "2.0", "id": 5, "method": "tools/list"}"#)
            .await
            .unwrap();
        assert!(decode_response(&line).unwrap().is_success());
    }
}
