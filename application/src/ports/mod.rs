//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod channel;
pub mod feature_switch;
pub mod invocation_observer;
pub mod tool_executor;
pub mod tool_handler;
