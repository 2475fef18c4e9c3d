//! Channel lifecycle and retry policy

pub mod retry;
pub mod state;

pub use retry::RetryPolicy;
pub use state::ChannelState;
