//! Tool domain value objects

use thiserror::Error;

/// Error raised inside a tool implementation.
///
/// The message crosses the process boundary verbatim, so it should be written
/// for the end user and never contain internal state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(format!("Invalid argument: {}", message.into()))
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(format!("Operation timed out: {}", operation.into()))
    }
}
