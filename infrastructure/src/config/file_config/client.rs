//! Client configuration from TOML (`[client]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [client]
//! enabled = true
//! command = "toolgate serve"
//! call_timeout_ms = 30000
//!
//! [client.retry]
//! max_attempts = 3
//!
//! [client.callers.personal]
//! tools = ["create_event", "list_agenda"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use toolgate_application::{InvokerSettings, SupervisorSettings};
use toolgate_domain::{CallerId, CapabilityAllowlist, RetryPolicy};

/// Retry settings for transport failures during a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5000,
        }
    }
}

impl FileRetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Server process lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSupervisorConfig {
    /// Spawn attempts per readiness check
    pub spawn_attempts: u32,
    /// Initial backoff between spawn attempts
    pub spawn_backoff_ms: u64,
    pub handshake_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    /// Time a server gets to exit on its own before SIGTERM
    pub grace_period_ms: u64,
}

impl Default for FileSupervisorConfig {
    fn default() -> Self {
        Self {
            spawn_attempts: 3,
            spawn_backoff_ms: 200,
            handshake_timeout_ms: 10_000,
            probe_timeout_ms: 2_000,
            grace_period_ms: 2_000,
        }
    }
}

impl FileSupervisorConfig {
    pub fn to_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            spawn_retry: RetryPolicy::new(
                self.spawn_attempts,
                Duration::from_millis(self.spawn_backoff_ms),
                Duration::from_millis(self.spawn_backoff_ms.saturating_mul(8)),
            ),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            grace_period: Duration::from_millis(self.grace_period_ms),
            ..SupervisorSettings::default()
        }
    }
}

/// Tools one caller restricts itself to on the client side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCallerConfig {
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileClientConfig {
    /// Feature switch; `TOOLGATE_ENABLED` overrides it at call time
    pub enabled: bool,
    /// Shell command that starts the tool server
    pub command: String,
    pub call_timeout_ms: u64,
    pub overall_timeout_ms: u64,
    pub retry: FileRetryConfig,
    pub supervisor: FileSupervisorConfig,
    pub callers: BTreeMap<String, FileCallerConfig>,
}

impl Default for FileClientConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "toolgate serve".to_string(),
            call_timeout_ms: 30_000,
            overall_timeout_ms: 90_000,
            retry: FileRetryConfig::default(),
            supervisor: FileSupervisorConfig::default(),
            callers: BTreeMap::new(),
        }
    }
}

impl FileClientConfig {
    pub fn to_invoker_settings(&self) -> InvokerSettings {
        InvokerSettings {
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            overall_timeout: Duration::from_millis(self.overall_timeout_ms),
            retry: self.retry.to_policy(),
            supervisor: self.supervisor.to_settings(),
        }
    }

    /// Client-side scopes as an allowlist, for building `CallerScope`s.
    pub fn scope_allowlist(&self) -> CapabilityAllowlist {
        self.callers
            .iter()
            .fold(CapabilityAllowlist::new(), |acc, (name, caller)| {
                match CallerId::new(name.as_str()) {
                    Some(id) => acc.grant(id, caller.tools.iter().cloned()),
                    None => acc,
                }
            })
    }
}
