//! Port for observing tool invocations.
//!
//! Defines the [`InvocationObserver`] trait that receives structured events
//! from the invoker and the process supervisor: call start, success with
//! duration, failure with reason, scheduled retries and channel state
//! transitions.
//!
//! [`TracingObserver`] turns events into `tracing` records. Infrastructure
//! provides a JSONL recorder for machine-readable transcripts.

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolgate_domain::util::{summarize_arguments, summarize_result};
use toolgate_domain::{CallerId, ChannelState, InvokeError, TransportError};
use tracing::{debug, info, warn};

/// A structured invocation event.
///
/// Events borrow from the invoker; observers that keep them must copy what
/// they need (see [`InvocationEvent::to_payload`]).
#[derive(Debug, Clone, Copy)]
pub enum InvocationEvent<'a> {
    CallStarted {
        tool: &'a str,
        caller: Option<&'a CallerId>,
        arguments: &'a serde_json::Map<String, Value>,
    },
    CallSucceeded {
        tool: &'a str,
        caller: Option<&'a CallerId>,
        duration: Duration,
        result: &'a Value,
    },
    CallFailed {
        tool: &'a str,
        caller: Option<&'a CallerId>,
        duration: Duration,
        error: &'a InvokeError,
    },
    RetryScheduled {
        tool: &'a str,
        attempt: u32,
        delay: Duration,
        cause: &'a TransportError,
    },
    StateChanged {
        from: ChannelState,
        to: ChannelState,
    },
}

impl InvocationEvent<'_> {
    /// Event type identifier (e.g., "call_started", "state_changed").
    pub fn event_type(&self) -> &'static str {
        match self {
            InvocationEvent::CallStarted { .. } => "call_started",
            InvocationEvent::CallSucceeded { .. } => "call_succeeded",
            InvocationEvent::CallFailed { .. } => "call_failed",
            InvocationEvent::RetryScheduled { .. } => "retry_scheduled",
            InvocationEvent::StateChanged { .. } => "state_changed",
        }
    }

    /// JSON payload with event-specific fields. Arguments and results are
    /// summarized, never copied whole.
    pub fn to_payload(&self) -> Value {
        let caller_value = |caller: Option<&CallerId>| {
            caller.map_or(Value::Null, |c| Value::String(c.to_string()))
        };
        match *self {
            InvocationEvent::CallStarted {
                tool,
                caller,
                arguments,
            } => json!({
                "tool": tool,
                "caller": caller_value(caller),
                "arguments": summarize_arguments(arguments),
            }),
            InvocationEvent::CallSucceeded {
                tool,
                caller,
                duration,
                result,
            } => json!({
                "tool": tool,
                "caller": caller_value(caller),
                "duration_ms": duration.as_millis() as u64,
                "result": summarize_result(result),
            }),
            InvocationEvent::CallFailed {
                tool,
                caller,
                duration,
                error,
            } => json!({
                "tool": tool,
                "caller": caller_value(caller),
                "duration_ms": duration.as_millis() as u64,
                "category": error.category(),
                "reason": error.to_string(),
            }),
            InvocationEvent::RetryScheduled {
                tool,
                attempt,
                delay,
                cause,
            } => json!({
                "tool": tool,
                "attempt": attempt,
                "delay_ms": delay.as_millis() as u64,
                "cause": cause.to_string(),
            }),
            InvocationEvent::StateChanged { from, to } => json!({
                "from": from.as_str(),
                "to": to.as_str(),
            }),
        }
    }
}

/// Receives invocation events.
///
/// The `on_event` method is synchronous and non-fallible so that observation
/// never disrupts an invocation; implementations swallow their own failures.
pub trait InvocationObserver: Send + Sync {
    fn on_event(&self, event: &InvocationEvent<'_>);
}

/// No-op implementation for tests and when observation is disabled.
pub struct NoObserver;

impl InvocationObserver for NoObserver {
    fn on_event(&self, _event: &InvocationEvent<'_>) {}
}

/// Emits every event as a `tracing` record.
pub struct TracingObserver;

impl InvocationObserver for TracingObserver {
    fn on_event(&self, event: &InvocationEvent<'_>) {
        match *event {
            InvocationEvent::CallStarted {
                tool,
                caller,
                arguments,
            } => {
                info!(
                    tool,
                    caller = caller.map(CallerId::as_str),
                    args = %summarize_arguments(arguments),
                    "tool call started"
                );
            }
            InvocationEvent::CallSucceeded {
                tool,
                caller,
                duration,
                result,
            } => {
                info!(
                    tool,
                    caller = caller.map(CallerId::as_str),
                    duration_ms = duration.as_millis() as u64,
                    result = %summarize_result(result),
                    "tool call succeeded"
                );
            }
            InvocationEvent::CallFailed {
                tool,
                caller,
                duration,
                error,
            } => {
                warn!(
                    tool,
                    caller = caller.map(CallerId::as_str),
                    duration_ms = duration.as_millis() as u64,
                    category = error.category().as_str(),
                    "tool call failed: {}",
                    error
                );
            }
            InvocationEvent::RetryScheduled {
                tool,
                attempt,
                delay,
                cause,
            } => {
                warn!(
                    tool,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying tool call after transport failure: {}",
                    cause
                );
            }
            InvocationEvent::StateChanged { from, to } => {
                debug!(from = from.as_str(), to = to.as_str(), "channel state changed");
            }
        }
    }
}

/// An observer that forwards every event to several inner observers.
pub struct CompositeObserver {
    delegates: Vec<Arc<dyn InvocationObserver>>,
}

impl CompositeObserver {
    pub fn new(delegates: Vec<Arc<dyn InvocationObserver>>) -> Self {
        Self { delegates }
    }
}

impl InvocationObserver for CompositeObserver {
    fn on_event(&self, event: &InvocationEvent<'_>) {
        for d in &self.delegates {
            d.on_event(event);
        }
    }
}

/// Records event types in order. Test helper.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub events: std::sync::Mutex<Vec<(&'static str, Value)>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn states(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == "state_changed")
            .map(|(_, p)| p["to"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == event_type)
            .count()
    }

    pub fn payloads(&self, event_type: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == event_type)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[cfg(test)]
impl InvocationObserver for RecordingObserver {
    fn on_event(&self, event: &InvocationEvent<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type(), event.to_payload()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_summarizes_arguments() {
        let caller = CallerId::new("personal").unwrap();
        let args = json!({"summary": "s".repeat(100), "attendees": ["a"], "user_id": 7});
        let event = InvocationEvent::CallStarted {
            tool: "create_event",
            caller: Some(&caller),
            arguments: args.as_object().unwrap(),
        };
        let payload = event.to_payload();
        assert_eq!(event.event_type(), "call_started");
        assert_eq!(payload["caller"], "personal");
        assert_eq!(payload["arguments"]["summary"].as_str().unwrap().len(), 64);
        assert_eq!(payload["arguments"]["attendees"], "array");
        assert_eq!(payload["arguments"]["user_id"], 7);
    }

    #[test]
    fn test_failure_payload_carries_category() {
        let error = InvokeError::Unauthorized("Caller 'command' is not allowed".into());
        let event = InvocationEvent::CallFailed {
            tool: "create_event",
            caller: None,
            duration: Duration::from_millis(12),
            error: &error,
        };
        let payload = event.to_payload();
        assert_eq!(payload["category"], "unauthorized");
        assert_eq!(payload["duration_ms"], 12);
        assert_eq!(payload["caller"], Value::Null);
    }

    #[test]
    fn test_composite_forwards_to_all() {
        let a = Arc::new(RecordingObserver::default());
        let b = Arc::new(RecordingObserver::default());
        let composite = CompositeObserver::new(vec![a.clone(), b.clone()]);
        composite.on_event(&InvocationEvent::StateChanged {
            from: ChannelState::Unstarted,
            to: ChannelState::Spawning,
        });
        assert_eq!(a.states(), vec!["spawning"]);
        assert_eq!(b.states(), vec!["spawning"]);
    }
}
