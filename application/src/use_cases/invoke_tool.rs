//! Invoke Tool use case
//!
//! [`ToolInvoker`] is the client side of the tool protocol. It owns one
//! [`ProcessSupervisor`] behind a FIFO mutex, so concurrent callers queue up
//! and each round trip runs alone on the channel.
//!
//! ```text
//! invoke(tool, args, caller)
//!   │ feature switch ── off ──▶ FeatureDisabled
//!   ▼
//! ┌────────── attempt (mutex held) ──────────┐
//! │ ensure_ready ── fail ──▶ TransportUnavailable
//! │ tools/call round trip                     │
//! │   transport failure ──▶ reset channel ────┼──▶ backoff (mutex released) ──▶ attempt
//! └───────────────────────────────────────────┘
//!   ▼
//! result │ server verdict (unauthorized, unknown_tool, tool_error, ...)
//! ```
//!
//! Only transport failures are retried. Every retry runs on a freshly spawned
//! server; a server that answered is never asked twice.

use crate::ports::channel::ChannelConnector;
use crate::ports::feature_switch::FeatureSwitch;
use crate::ports::invocation_observer::{InvocationEvent, InvocationObserver};
use crate::supervisor::{ProcessSupervisor, SupervisorError, SupervisorSettings};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use toolgate_domain::{
    AuthorizationError, CallerId, CapabilityAllowlist, ChannelState, InvokeError, Method,
    Response, ResponseError, RetryPolicy, ToolCall, ToolDefinition, TransportError,
};
use tracing::{debug, warn};

/// Reserved tool name that lists the server's tools instead of calling one.
pub const LIST_TOOLS: &str = "tools/list";

/// Invoker tuning.
#[derive(Debug, Clone)]
pub struct InvokerSettings {
    /// Bound on one `tools/call` round trip.
    pub call_timeout: Duration,
    /// Bound on a whole invocation, including spawns, retries and backoff.
    pub overall_timeout: Duration,
    pub retry: RetryPolicy,
    pub supervisor: SupervisorSettings,
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(90),
            retry: RetryPolicy::default(),
            supervisor: SupervisorSettings::default(),
        }
    }
}

enum AttemptError {
    Unavailable(SupervisorError),
    Transport(TransportError),
}

/// Client handle for invoking tools on the tool server.
///
/// Construct one and share it by `Arc`.
pub struct ToolInvoker {
    supervisor: Mutex<ProcessSupervisor>,
    call_timeout: Duration,
    overall_timeout: Duration,
    retry: RetryPolicy,
    switch: Arc<dyn FeatureSwitch>,
    observer: Arc<dyn InvocationObserver>,
}

impl ToolInvoker {
    pub fn new(
        connector: Arc<dyn ChannelConnector>,
        settings: InvokerSettings,
        switch: Arc<dyn FeatureSwitch>,
        observer: Arc<dyn InvocationObserver>,
    ) -> Self {
        Self {
            supervisor: Mutex::new(ProcessSupervisor::new(
                connector,
                settings.supervisor,
                observer.clone(),
            )),
            call_timeout: settings.call_timeout,
            overall_timeout: settings.overall_timeout,
            retry: settings.retry,
            switch,
            observer,
        }
    }

    /// Invoke `tool` on behalf of `caller`.
    ///
    /// `caller` is written into `arguments.caller`, replacing any value the
    /// arguments already carried.
    pub async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
        caller: &CallerId,
    ) -> Result<Value, InvokeError> {
        if !self.switch.is_enabled() {
            return Err(InvokeError::FeatureDisabled);
        }

        if tool == LIST_TOOLS {
            let tools = self.list_tools(Some(caller)).await?;
            return Ok(json!({ "tools": tools }));
        }

        let call = ToolCall::new(tool, caller.clone()).with_arguments(arguments);
        let mut params = Map::new();
        params.insert("name".to_string(), Value::String(call.tool_name.clone()));
        params.insert(
            "arguments".to_string(),
            Value::Object(call.wire_arguments()),
        );

        self.run(
            &call.tool_name,
            Some(&call.caller),
            &call.arguments,
            Method::ToolsCall,
            params,
        )
        .await
    }

    /// List the server's tools. Not subject to the allowlist.
    pub async fn list_tools(
        &self,
        caller: Option<&CallerId>,
    ) -> Result<Vec<ToolDefinition>, InvokeError> {
        if !self.switch.is_enabled() {
            return Err(InvokeError::FeatureDisabled);
        }

        let result = self
            .run(LIST_TOOLS, caller, &Map::new(), Method::ToolsList, Map::new())
            .await?;
        ToolDefinition::list_from_value(&result).map_err(|reason| {
            InvokeError::ToolInvocationFailed {
                attempts: 1,
                cause: TransportError::MalformedMessage(reason),
            }
        })
    }

    /// Close the channel. Later invocations fail with `TransportUnavailable`.
    pub async fn shutdown(&self) {
        self.supervisor.lock().await.shutdown().await;
    }

    pub async fn state(&self) -> ChannelState {
        self.supervisor.lock().await.state()
    }

    async fn run(
        &self,
        tool: &str,
        caller: Option<&CallerId>,
        arguments: &Map<String, Value>,
        method: Method,
        params: Map<String, Value>,
    ) -> Result<Value, InvokeError> {
        self.observer.on_event(&InvocationEvent::CallStarted {
            tool,
            caller,
            arguments,
        });
        let started = Instant::now();
        let attempts = AtomicU32::new(0);

        let outcome = match tokio::time::timeout(
            self.overall_timeout,
            self.run_with_retry(tool, method, params, &attempts),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                self.supervisor.lock().await.recover_interrupted().await;
                Err(InvokeError::ToolInvocationFailed {
                    attempts: attempts.load(Ordering::SeqCst).max(1),
                    cause: TransportError::Timeout(self.overall_timeout),
                })
            }
        };

        let duration = started.elapsed();
        match &outcome {
            Ok(result) => self.observer.on_event(&InvocationEvent::CallSucceeded {
                tool,
                caller,
                duration,
                result,
            }),
            Err(error) => self.observer.on_event(&InvocationEvent::CallFailed {
                tool,
                caller,
                duration,
                error,
            }),
        }
        outcome
    }

    async fn run_with_retry(
        &self,
        tool: &str,
        method: Method,
        params: Map<String, Value>,
        attempts: &AtomicU32,
    ) -> Result<Value, InvokeError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            attempts.store(attempt, Ordering::SeqCst);

            let outcome = {
                let mut supervisor = self.supervisor.lock().await;
                Self::attempt(&mut supervisor, method, params.clone(), self.call_timeout).await
            };

            let cause = match outcome {
                Ok(response) => {
                    return response.outcome.map_err(ResponseError::into_invoke_error);
                }
                Err(AttemptError::Unavailable(e)) => {
                    return Err(InvokeError::TransportUnavailable(e.to_string()));
                }
                Err(AttemptError::Transport(cause)) => cause,
            };

            if !self.retry.should_retry(attempt) {
                return Err(InvokeError::ToolInvocationFailed {
                    attempts: attempt,
                    cause,
                });
            }

            let delay = self.retry.delay_for(attempt);
            self.observer.on_event(&InvocationEvent::RetryScheduled {
                tool,
                attempt,
                delay,
                cause: &cause,
            });
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        supervisor: &mut ProcessSupervisor,
        method: Method,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response, AttemptError> {
        supervisor
            .ensure_ready()
            .await
            .map_err(AttemptError::Unavailable)?;

        match supervisor.round_trip(method, params, timeout).await {
            Ok(response) => Ok(response),
            Err(cause) => {
                debug!(method = method.as_str(), "Round trip failed: {}", cause);
                supervisor.fail().await;
                Err(AttemptError::Transport(cause))
            }
        }
    }
}

/// A caller bound to an invoker, with its own advisory tool set.
///
/// Tools outside the set are rejected locally with `Unauthorized` before the
/// channel is touched. An empty set defers entirely to the server.
pub struct CallerScope {
    caller: CallerId,
    allowed_tools: BTreeSet<String>,
    invoker: Arc<ToolInvoker>,
}

impl CallerScope {
    pub fn new<I, S>(caller: CallerId, allowed_tools: I, invoker: Arc<ToolInvoker>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            caller,
            allowed_tools: allowed_tools.into_iter().map(Into::into).collect(),
            invoker,
        }
    }

    /// Scope whose tool set is `caller`'s grants in `allowlist`.
    pub fn from_allowlist(
        caller: CallerId,
        allowlist: &CapabilityAllowlist,
        invoker: Arc<ToolInvoker>,
    ) -> Self {
        let tools: Vec<String> = allowlist
            .tools_for(&caller)
            .into_iter()
            .map(str::to_string)
            .collect();
        Self::new(caller, tools, invoker)
    }

    pub fn caller(&self) -> &CallerId {
        &self.caller
    }

    pub fn allows(&self, tool: &str) -> bool {
        self.allowed_tools.is_empty() || tool == LIST_TOOLS || self.allowed_tools.contains(tool)
    }

    pub async fn invoke(&self, tool: &str, arguments: Map<String, Value>) -> Result<Value, InvokeError> {
        if !self.allows(tool) {
            let denied = AuthorizationError::NotGranted {
                caller: self.caller.to_string(),
                tool: tool.to_string(),
            };
            warn!(tool, caller = self.caller.as_str(), "Rejected locally: {}", denied);
            return Err(InvokeError::Unauthorized(denied.to_string()));
        }
        self.invoker.invoke(tool, arguments, &self.caller).await
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, InvokeError> {
        self.invoker.list_tools(Some(&self.caller)).await
    }
}
