//! Channel ports
//!
//! Defines how the application layer reaches a tool server: a
//! [`ChannelConnector`] produces fresh [`RpcConnection`]s (one per server
//! process), and a connection moves whole lines in both directions.

use async_trait::async_trait;
use std::time::Duration;
use toolgate_domain::TransportError;

/// A live, line-oriented connection to one tool server instance.
///
/// Lines never contain the `\n` terminator. Implementations live in the
/// infrastructure layer (child process pipes, in-process duplex pipes).
#[async_trait]
pub trait RpcConnection: Send {
    /// Write one line and flush it.
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Wait up to `timeout` for the next full line.
    async fn receive_line(&mut self, timeout: Duration) -> Result<String, TransportError>;

    /// Release the connection. A server process gets `grace` to exit on its own
    /// before it is killed. Calling `close` twice is a no-op.
    async fn close(&mut self, grace: Duration);
}

/// Factory for [`RpcConnection`]s.
///
/// Every `connect` starts a brand new server; the supervisor guarantees at
/// most one connection is alive at a time.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RpcConnection>, TransportError>;
}
