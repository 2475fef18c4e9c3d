//! Infrastructure layer for toolgate
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the line transport, child-process and in-process
//! connectors, the stdio server loop, the tool registry, configuration
//! file loading and the JSONL invocation log.

pub mod config;
pub mod logging;
pub mod process;
pub mod server;
pub mod switch;
pub mod tools;
pub mod transport;

// Re-export commonly used types
pub use config::{
    CONFIG_PATH_VAR, ConfigIssue, ConfigLoader, ConfigValidationError, FileConfig, Severity,
};
pub use logging::JsonlInvocationLogger;
pub use process::{ChildProcessConnector, InProcessConnector};
pub use server::{ServeReport, serve_lines, serve_stdio};
pub use switch::{ENABLED_VAR, EnvFeatureSwitch};
pub use tools::{CommandTool, ToolRegistry};
pub use transport::LineTransport;
