//! Tool server inside the current runtime.
//!
//! [`InProcessConnector`] runs the real dispatch loop on a spawned task and
//! connects to it over an in-memory duplex pipe. Every `connect` starts a
//! fresh loop, just as the child-process connector starts a fresh process.

use crate::server::stdio::serve_lines;
use crate::transport::LineTransport;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolgate_application::RequestDispatcher;
use toolgate_application::ports::channel::{ChannelConnector, RpcConnection};
use toolgate_domain::TransportError;
use tracing::{debug, warn};

const PIPE_CAPACITY: usize = 64 * 1024;

pub struct InProcessConnector {
    dispatcher: Arc<RequestDispatcher>,
}

impl InProcessConnector {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl ChannelConnector for InProcessConnector {
    async fn connect(&self) -> Result<Box<dyn RpcConnection>, TransportError> {
        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);

        let cancel = CancellationToken::new();
        let dispatcher = self.dispatcher.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            match serve_lines(BufReader::new(server_read), server_write, &dispatcher, token).await {
                Ok(report) => debug!(
                    processed = report.processed,
                    errors = report.errors,
                    "In-process server stopped"
                ),
                Err(e) => warn!("In-process server failed: {}", e),
            }
        });

        Ok(Box::new(InProcessConnection {
            transport: LineTransport::new(BufReader::new(client_read), client_write),
            task: Some(task),
            cancel,
        }))
    }
}

pub struct InProcessConnection {
    transport: LineTransport<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>,
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

#[async_trait]
impl RpcConnection for InProcessConnection {
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.transport.send(line).await
    }

    async fn receive_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        self.transport.receive_line(timeout).await
    }

    async fn close(&mut self, grace: Duration) {
        self.transport.close().await;
        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            debug!("In-process server still busy after grace period, aborting");
            self.cancel.cancel();
            task.abort();
        }
    }
}

impl Drop for InProcessConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
