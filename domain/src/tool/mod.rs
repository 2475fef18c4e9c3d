//! Tool domain module
//!
//! A tool is a named, privileged operation the server exposes to callers
//! (create a calendar event, search documentation, ...). The domain only knows
//! its public shape; implementations live behind the application layer's
//! `ToolHandler` port.
//!
//! - [`ToolDefinition`] - name and description, as listed by `tools/list`
//! - [`ToolCall`] - an invocation: tool name, caller identity, arguments
//! - [`ToolError`] - an error raised by a tool implementation

pub mod entities;
pub mod value_objects;

pub use entities::{CALLER_FIELD, ToolCall, ToolDefinition};
pub use value_objects::ToolError;
