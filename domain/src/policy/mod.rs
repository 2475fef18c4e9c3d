//! Capability policy
//!
//! The [`CapabilityAllowlist`] is the sole authorization mechanism of the tool
//! server. The client keeps an advisory copy per caller so it can fail fast, but
//! only the server-side check is authoritative.

pub mod allowlist;

pub use allowlist::{AuthorizationError, CapabilityAllowlist};
