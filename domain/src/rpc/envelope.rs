//! Request/response envelope types for the tool channel.
//!
//! # Wire format
//!
//! One JSON object per line:
//!
//! - Request: `{"jsonrpc": "2.0", "id": <token>, "method": <string>, "params": {...}}`
//! - Success: `{"id": <token>, "result": <any>}`
//! - Failure: `{"id": <token>, "error": <string>, "code": <string>}`
//!
//! The `code` field is optional; a failure without one is treated as an error
//! raised by the tool itself.

use crate::core::error::InvokeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC version tag written on requests for MCP-style peers.
pub const JSONRPC_VERSION: &str = "2.0";

/// The closed set of methods the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "initialize")]
    Initialize,
    #[serde(rename = "tools/list")]
    ToolsList,
    #[serde(rename = "tools/call")]
    ToolsCall,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Initialize, Method::ToolsList, Method::ToolsCall];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unsupported method '{}'", s))
    }
}

/// Opaque correlation token.
///
/// The client issues integers; the server echoes whatever JSON value it got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Value);

impl RequestId {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The id used when a request line was too broken to carry one.
    pub fn null() -> Self {
        Self(Value::Null)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(Value::from(id))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: Method,
    pub params: Map<String, Value>,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: Method, params: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            method,
            params,
        }
    }
}

/// Stable error codes carried in a failure response's `code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingCaller,
    Unauthorized,
    UnknownTool,
    InvalidParams,
    MethodNotFound,
    MalformedRequest,
    ToolError,
}

impl ErrorCode {
    const ALL: [ErrorCode; 7] = [
        ErrorCode::MissingCaller,
        ErrorCode::Unauthorized,
        ErrorCode::UnknownTool,
        ErrorCode::InvalidParams,
        ErrorCode::MethodNotFound,
        ErrorCode::MalformedRequest,
        ErrorCode::ToolError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingCaller => "missing_caller",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::UnknownTool => "unknown_tool",
            ErrorCode::InvalidParams => "invalid_params",
            ErrorCode::MethodNotFound => "method_not_found",
            ErrorCode::MalformedRequest => "malformed_request",
            ErrorCode::ToolError => "tool_error",
        }
    }

    /// Parse a wire code; unknown codes yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure payload of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl ResponseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Rebuild the typed client error. Missing or unknown codes count as tool errors.
    pub fn into_invoke_error(self) -> InvokeError {
        match self.code.unwrap_or(ErrorCode::ToolError) {
            ErrorCode::MissingCaller => InvokeError::MissingCaller(self.message),
            ErrorCode::Unauthorized => InvokeError::Unauthorized(self.message),
            ErrorCode::UnknownTool => InvokeError::UnknownTool(self.message),
            ErrorCode::InvalidParams | ErrorCode::MethodNotFound | ErrorCode::MalformedRequest => {
                InvokeError::InvalidRequest(self.message)
            }
            ErrorCode::ToolError => InvokeError::ToolFailed(self.message),
        }
    }
}

/// A decoded response. Exactly one of result or error.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub outcome: Result<Value, ResponseError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            outcome: Ok(result),
        }
    }

    pub fn failure(id: RequestId, error: ResponseError) -> Self {
        Self {
            id,
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
