//! Tool implementations for the tool server
//!
//! - [`ToolRegistry`]: name-keyed handlers behind the dispatcher
//! - [`CommandTool`]: a tool backed by an external command

pub mod command;

mod registry;

pub use command::CommandTool;
pub use registry::ToolRegistry;
