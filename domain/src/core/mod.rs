//! Core domain concepts shared across all subdomains.
//!
//! - [`caller::CallerId`] - the cooperative label attached to every tool call
//! - [`error::InvokeError`] / [`error::TransportError`] - the error taxonomy

pub mod caller;
pub mod error;
