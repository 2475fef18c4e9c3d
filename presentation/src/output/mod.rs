//! Output formatting for invocation results

pub mod console;
