//! Server side of the tool channel.

pub mod stdio;

pub use stdio::{ServeReport, serve_lines, serve_stdio};
