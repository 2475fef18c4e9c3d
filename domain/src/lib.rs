//! Domain layer for toolgate
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Capability-gated tools
//!
//! Privileged operations ("tools") run in a separate server process. Every
//! invocation carries a [`CallerId`]; the server checks it against a static
//! [`CapabilityAllowlist`] before anything executes.
//!
//! ## Channel
//!
//! Client and server talk newline-delimited JSON ([`rpc`]) over a byte
//! channel whose lifecycle is a small state machine ([`ChannelState`]).
//! Only transport failures are retried, following a [`RetryPolicy`].

pub mod channel;
pub mod core;
pub mod policy;
pub mod rpc;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use channel::{ChannelState, RetryPolicy};
pub use core::{
    caller::CallerId,
    error::{ErrorCategory, InvokeError, TransportError},
};
pub use policy::{AuthorizationError, CapabilityAllowlist};
pub use rpc::{
    ErrorCode, JSONRPC_VERSION, Method, PROTOCOL_VERSION, Request, RequestDecodeError, RequestId,
    Response, ResponseError, decode_request, decode_response, encode_request, encode_response,
};
pub use tool::{CALLER_FIELD, ToolCall, ToolDefinition, ToolError};
