//! Process supervisor - owns the channel to the tool server.
//!
//! The supervisor drives the [`ChannelState`] machine: it spawns a server
//! through the [`ChannelConnector`] port, performs the `initialize` handshake,
//! probes a ready channel before reuse, and tears the server down after any
//! transport failure. At most one server is alive at a time; the previous
//! connection is always closed before the next spawn.
//!
//! The supervisor is not shared directly. The invoker keeps it behind a FIFO
//! mutex, which also serializes round trips.

use crate::ports::channel::{ChannelConnector, RpcConnection};
use crate::ports::invocation_observer::{InvocationEvent, InvocationObserver};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use toolgate_domain::{
    ChannelState, Method, PROTOCOL_VERSION, Request, RequestId, Response, RetryPolicy,
    TransportError, decode_response, encode_request,
};
use tracing::{debug, info, warn};

/// Supervisor tuning.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Spawn attempts per `ensure_ready` and the backoff between them.
    pub spawn_retry: RetryPolicy,
    pub handshake_timeout: Duration,
    pub probe_timeout: Duration,
    /// Time a server gets to exit after its input closes before it is killed.
    pub grace_period: Duration,
    /// Name reported in `clientInfo` during the handshake.
    pub client_name: String,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            spawn_retry: RetryPolicy::default(),
            handshake_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
            grace_period: Duration::from_secs(2),
            client_name: "toolgate".to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("tool server channel is closed")]
    Closed,

    #[error("failed to start tool server after {attempts} attempt(s): {cause}")]
    SpawnFailed { attempts: u32, cause: TransportError },
}

pub struct ProcessSupervisor {
    connector: Arc<dyn ChannelConnector>,
    settings: SupervisorSettings,
    observer: Arc<dyn InvocationObserver>,
    state: ChannelState,
    connection: Option<Box<dyn RpcConnection>>,
    next_id: u64,
    /// Set while a request is unanswered. Still set on the next
    /// `ensure_ready` means the previous round trip was cancelled.
    in_flight: bool,
}

impl ProcessSupervisor {
    pub fn new(
        connector: Arc<dyn ChannelConnector>,
        settings: SupervisorSettings,
        observer: Arc<dyn InvocationObserver>,
    ) -> Self {
        Self {
            connector,
            settings,
            observer,
            state: ChannelState::Unstarted,
            connection: None,
            next_id: 0,
            in_flight: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Bring the channel to `Ready`, spawning a server if needed.
    pub async fn ensure_ready(&mut self) -> Result<(), SupervisorError> {
        if self.state.is_closed() {
            return Err(SupervisorError::Closed);
        }

        if self.in_flight {
            debug!("Previous round trip was interrupted, resetting channel");
            self.degrade();
            self.reset().await;
        }

        if self.state.is_ready() {
            match self.probe().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Tool server failed liveness probe: {}", e);
                    self.fail().await;
                }
            }
        }

        self.start().await
    }

    /// One correlated request/response exchange on the current connection.
    ///
    /// A response whose id does not match is a protocol violation and is
    /// reported as a malformed message.
    pub async fn round_trip(
        &mut self,
        method: Method,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response, TransportError> {
        self.next_id += 1;
        let id = RequestId::from(self.next_id);
        let line = encode_request(&Request::new(id.clone(), method, params));

        let connection = self
            .connection
            .as_mut()
            .ok_or(TransportError::EndOfStream)?;

        self.in_flight = true;
        connection.send_line(&line).await?;
        let reply = connection.receive_line(timeout).await?;
        self.in_flight = false;

        let response = decode_response(&reply)?;
        if response.id != id {
            return Err(TransportError::malformed(format!(
                "response id {} does not match request id {}",
                response.id, id
            )));
        }
        Ok(response)
    }

    /// Tear down the server after a transport failure. The next
    /// `ensure_ready` spawns a fresh one.
    pub async fn fail(&mut self) {
        self.degrade();
        self.reset().await;
    }

    /// Clean up after a round trip or spawn that was cancelled from outside.
    /// A channel left mid-request or mid-startup is torn down; a settled one
    /// is left alone.
    pub async fn recover_interrupted(&mut self) {
        let interrupted = self.in_flight
            || matches!(
                self.state,
                ChannelState::Spawning | ChannelState::Handshaking
            );
        if interrupted && !self.state.is_closed() {
            debug!(state = %self.state, "Channel interrupted, resetting");
            self.fail().await;
        }
    }

    /// Close the channel for good.
    pub async fn shutdown(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.close_connection().await;
        self.transition(ChannelState::Closed);
        info!("Tool server channel closed");
    }

    async fn start(&mut self) -> Result<(), SupervisorError> {
        self.reset().await;

        let policy = self.settings.spawn_retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.spawn_and_handshake().await {
                Ok(()) => {
                    self.transition(ChannelState::Ready);
                    info!(attempt, "Tool server ready");
                    return Ok(());
                }
                Err(cause) => {
                    warn!(attempt, "Failed to start tool server: {}", cause);
                    self.reset().await;
                    if !policy.should_retry(attempt) {
                        return Err(SupervisorError::SpawnFailed {
                            attempts: attempt,
                            cause,
                        });
                    }
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    async fn spawn_and_handshake(&mut self) -> Result<(), TransportError> {
        self.transition(ChannelState::Spawning);
        let connection = self.connector.connect().await?;
        self.connection = Some(connection);

        self.transition(ChannelState::Handshaking);
        let mut params = Map::new();
        params.insert("protocolVersion".into(), json!(PROTOCOL_VERSION));
        params.insert(
            "clientInfo".into(),
            json!({ "name": self.settings.client_name, "version": env!("CARGO_PKG_VERSION") }),
        );
        params.insert("capabilities".into(), json!({}));

        let response = self
            .round_trip(Method::Initialize, params, self.settings.handshake_timeout)
            .await?;
        match response.outcome {
            Ok(result) => {
                if let Some(version) = result.get("protocolVersion").and_then(Value::as_str)
                    && version != PROTOCOL_VERSION
                {
                    debug!(version, "Tool server speaks a different protocol version");
                }
                Ok(())
            }
            Err(e) => Err(TransportError::malformed(format!(
                "handshake rejected: {}",
                e.message
            ))),
        }
    }

    /// Any well-formed, correlated answer to `tools/list` counts as alive.
    async fn probe(&mut self) -> Result<(), TransportError> {
        self.round_trip(Method::ToolsList, Map::new(), self.settings.probe_timeout)
            .await
            .map(|_| ())
    }

    fn degrade(&mut self) {
        if self.state.is_ready() {
            self.transition(ChannelState::Degraded);
        }
    }

    /// Close the connection and return to `Unstarted`.
    async fn reset(&mut self) {
        self.close_connection().await;
        if matches!(
            self.state,
            ChannelState::Spawning | ChannelState::Handshaking | ChannelState::Degraded
        ) {
            self.transition(ChannelState::Unstarted);
        }
    }

    async fn close_connection(&mut self) {
        self.in_flight = false;
        if let Some(mut connection) = self.connection.take() {
            connection.close(self.settings.grace_period).await;
        }
    }

    fn transition(&mut self, to: ChannelState) {
        let from = self.state;
        debug_assert!(
            from.can_transition_to(to),
            "illegal channel transition {} -> {}",
            from,
            to
        );
        self.state = to;
        self.observer
            .on_event(&InvocationEvent::StateChanged { from, to });
    }
}
