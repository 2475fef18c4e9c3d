//! Test doubles shared by the use case tests.

use crate::ports::channel::{ChannelConnector, RpcConnection};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::tool_handler::ToolHandler;
use crate::use_cases::dispatch::RequestDispatcher;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use toolgate_domain::{ToolDefinition, ToolError, TransportError};

/// In-memory registry.
#[derive(Default)]
pub(crate) struct MapExecutor {
    tools: BTreeMap<String, (ToolDefinition, Arc<dyn ToolHandler>)>,
}

impl MapExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(
        mut self,
        name: &str,
        description: &str,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        self.tools.insert(
            name.to_string(),
            (ToolDefinition::new(name, description), Arc::new(handler)),
        );
        self
    }
}

#[async_trait]
impl ToolExecutorPort for MapExecutor {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|(d, _)| d.clone()).collect()
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    async fn execute(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        match self.tools.get(name) {
            Some((_, handler)) => handler.call(arguments).await,
            None => Err(ToolError::new(format!("Unknown tool: {}", name))),
        }
    }
}

/// Failure injection and bookkeeping for [`LoopbackConnector`].
#[derive(Default)]
pub(crate) struct LoopbackState {
    /// Successful connects.
    pub spawns: AtomicUsize,
    /// Upcoming connects that fail.
    pub fail_spawns: AtomicUsize,
    /// Upcoming `tools/call` requests after which the server's output closes.
    pub crash_calls: AtomicUsize,
    /// Upcoming `tools/call` requests that never get an answer.
    pub hang_calls: AtomicUsize,
    /// Connections closed by the supervisor.
    pub closes: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// `send:<id>` / `recv:<id>` in channel order.
    pub trace: Mutex<Vec<String>>,
}

impl LoopbackState {
    pub fn trace(&self) -> Vec<String> {
        self.trace.lock().unwrap().clone()
    }
}

/// Connects to a [`RequestDispatcher`] running in the same task. Each connect
/// counts as a fresh server process.
pub(crate) struct LoopbackConnector {
    dispatcher: Arc<RequestDispatcher>,
    state: Arc<LoopbackState>,
}

impl LoopbackConnector {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self {
            dispatcher,
            state: Arc::new(LoopbackState::default()),
        }
    }

    pub fn state(&self) -> Arc<LoopbackState> {
        self.state.clone()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl ChannelConnector for LoopbackConnector {
    async fn connect(&self) -> Result<Box<dyn RpcConnection>, TransportError> {
        if take_one(&self.state.fail_spawns) {
            return Err(TransportError::Io("failed to spawn tool server".into()));
        }
        self.state.spawns.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LoopbackConnection {
            dispatcher: self.dispatcher.clone(),
            state: self.state.clone(),
            pending: VecDeque::new(),
            crashed: false,
            hung: false,
            closed: false,
        }))
    }
}

struct LoopbackConnection {
    dispatcher: Arc<RequestDispatcher>,
    state: Arc<LoopbackState>,
    pending: VecDeque<String>,
    crashed: bool,
    hung: bool,
    closed: bool,
}

fn line_id(line: &str) -> String {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .map(|id| id.to_string())
        .unwrap_or_default()
}

#[async_trait]
impl RpcConnection for LoopbackConnection {
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.closed || self.crashed {
            return Err(TransportError::EndOfStream);
        }
        self.state
            .trace
            .lock()
            .unwrap()
            .push(format!("send:{}", line_id(line)));
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if line.contains("\"tools/call\"") {
            if take_one(&self.state.crash_calls) {
                self.crashed = true;
                return Ok(());
            }
            if take_one(&self.state.hang_calls) {
                self.hung = true;
                return Ok(());
            }
        }
        if let Some(reply) = self.dispatcher.handle_line(line).await {
            self.pending.push_back(reply);
        }
        Ok(())
    }

    async fn receive_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        tokio::task::yield_now().await;
        if self.crashed || self.closed {
            return Err(TransportError::EndOfStream);
        }
        if self.hung {
            tokio::time::sleep(timeout).await;
            return Err(TransportError::Timeout(timeout));
        }
        match self.pending.pop_front() {
            Some(reply) => {
                self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.state
                    .trace
                    .lock()
                    .unwrap()
                    .push(format!("recv:{}", line_id(&reply)));
                Ok(reply)
            }
            None => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    async fn close(&mut self, _grace: Duration) {
        if !self.closed {
            self.closed = true;
            if self.crashed || self.hung {
                self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
