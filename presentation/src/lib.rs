//! Presentation layer for toolgate
//!
//! This crate contains the CLI definition and console output formatting.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat, parse_arguments};
pub use output::console::ConsoleFormatter;
