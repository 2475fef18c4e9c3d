//! Logging infrastructure - structured invocation logging.
//!
//! Provides [`JsonlInvocationLogger`], a JSONL file writer that implements
//! the [`InvocationObserver`](toolgate_application::InvocationObserver) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlInvocationLogger;
