//! Error taxonomy for tool invocation
//!
//! Two levels of failure exist:
//!
//! - [`TransportError`] - the byte channel itself misbehaved (timeout, closed
//!   stream, undecodable line). These are the only failures eligible for retry,
//!   and always force a channel reset.
//! - [`InvokeError`] - what a caller of `invoke` finally observes. Every variant
//!   maps to a stable [`ErrorCategory`] so callers can pattern-match instead of
//!   parsing messages.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures of the line-oriented channel to the tool server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out after {}ms waiting for the tool server", .0.as_millis())]
    Timeout(Duration),

    #[error("tool server closed its output stream")]
    EndOfStream,

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage(reason.into())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof => {
                TransportError::EndOfStream
            }
            _ => TransportError::Io(err.to_string()),
        }
    }
}

/// Stable, short error categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    FeatureDisabled,
    TransportUnavailable,
    ToolInvocationFailed,
    Unauthorized,
    MissingCaller,
    UnknownTool,
    InvalidRequest,
    ToolError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::FeatureDisabled => "feature_disabled",
            ErrorCategory::TransportUnavailable => "transport_unavailable",
            ErrorCategory::ToolInvocationFailed => "tool_invocation_failed",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::MissingCaller => "missing_caller",
            ErrorCategory::UnknownTool => "unknown_tool",
            ErrorCategory::InvalidRequest => "invalid_request",
            ErrorCategory::ToolError => "tool_error",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result error of a tool invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error("Tool invocation is disabled. Set TOOLGATE_ENABLED=1 or client.enabled = true to turn it on.")]
    FeatureDisabled,

    #[error("Tool server unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Tool invocation failed after {attempts} attempt(s): {cause}")]
    ToolInvocationFailed {
        attempts: u32,
        cause: TransportError,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    MissingCaller(String),

    #[error("{0}")]
    UnknownTool(String),

    #[error("{0}")]
    InvalidRequest(String),

    /// Error raised inside the tool implementation, passed through verbatim.
    #[error("{0}")]
    ToolFailed(String),
}

impl InvokeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            InvokeError::FeatureDisabled => ErrorCategory::FeatureDisabled,
            InvokeError::TransportUnavailable(_) => ErrorCategory::TransportUnavailable,
            InvokeError::ToolInvocationFailed { .. } => ErrorCategory::ToolInvocationFailed,
            InvokeError::Unauthorized(_) => ErrorCategory::Unauthorized,
            InvokeError::MissingCaller(_) => ErrorCategory::MissingCaller,
            InvokeError::UnknownTool(_) => ErrorCategory::UnknownTool,
            InvokeError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            InvokeError::ToolFailed(_) => ErrorCategory::ToolError,
        }
    }

    /// Whether the failure came from the channel rather than from the server's verdict.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            InvokeError::TransportUnavailable(_) | InvokeError::ToolInvocationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_codes_are_stable() {
        assert_eq!(InvokeError::FeatureDisabled.category().as_str(), "feature_disabled");
        assert_eq!(
            InvokeError::Unauthorized("nope".into()).category().as_str(),
            "unauthorized"
        );
        assert_eq!(
            InvokeError::ToolFailed("boom".into()).category().to_string(),
            "tool_error"
        );
    }

    #[test]
    fn test_category_serializes_as_code() {
        let value = serde_json::to_value(ErrorCategory::ToolInvocationFailed).unwrap();
        assert_eq!(value, serde_json::json!("tool_invocation_failed"));
        for category in [
            ErrorCategory::FeatureDisabled,
            ErrorCategory::MissingCaller,
            ErrorCategory::InvalidRequest,
        ] {
            assert_eq!(serde_json::to_value(category).unwrap(), category.as_str());
        }
    }

    #[test]
    fn test_tool_failure_message_is_verbatim() {
        let err = InvokeError::ToolFailed("Missing Google credentials. Use /connect_google.".into());
        assert_eq!(err.to_string(), "Missing Google credentials. Use /connect_google.");
    }

    #[test]
    fn test_is_transport() {
        let failed = InvokeError::ToolInvocationFailed {
            attempts: 3,
            cause: TransportError::EndOfStream,
        };
        assert!(failed.is_transport());
        assert!(InvokeError::TransportUnavailable("spawn".into()).is_transport());
        assert!(!InvokeError::Unauthorized("x".into()).is_transport());
        assert!(!InvokeError::ToolFailed("x".into()).is_transport());
    }

    #[test]
    fn test_io_error_conversion() {
        let closed: TransportError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert_eq!(closed, TransportError::EndOfStream);

        let other: TransportError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(other, TransportError::Io(_)));
    }

    #[test]
    fn test_timeout_display() {
        let err = TransportError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "timed out after 1500ms waiting for the tool server");
    }
}
