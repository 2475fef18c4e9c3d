//! Raw TOML configuration data types
//!
//! These structs mirror the config file exactly and convert into the
//! application's settings types on demand.

mod client;
mod server;

pub use client::{FileCallerConfig, FileClientConfig, FileRetryConfig, FileSupervisorConfig};
pub use server::{FileServerConfig, FileToolConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems `FileConfig::validate` can detect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{field} must be greater than 0")]
    ZeroValue { field: String },

    #[error("{field} is empty")]
    EmptyCommand { field: String },

    #[error("server.allowlist.{caller} grants '{tool}', which is not a configured tool")]
    UnconfiguredTool { caller: String, tool: String },

    #[error("client.callers.{caller} lists '{tool}', which server.allowlist does not grant to it")]
    ScopeExceedsAllowlist { caller: String, tool: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One finding from validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub error: ConfigValidationError,
}

impl ConfigIssue {
    fn error(error: ConfigValidationError) -> Self {
        Self {
            severity: Severity::Error,
            error,
        }
    }

    fn warning(error: ConfigValidationError) -> Self {
        Self {
            severity: Severity::Warning,
            error,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Invoker side: how to start and talk to the tool server
    pub client: FileClientConfig,
    /// Server side: allowlist and command-backed tools
    pub server: FileServerConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks:
    /// 1. Zero timeouts and attempt counts
    /// 2. Empty server and tool commands
    /// 3. Allowlist entries naming tools that are not configured (warning,
    ///    skipped when no tools are configured since handlers may be
    ///    registered in code)
    /// 4. Client scopes wider than the server allowlist (warning, skipped
    ///    when the allowlist is empty)
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let client = &self.client;

        // 1. Zero values
        let numbers = [
            ("client.call_timeout_ms", client.call_timeout_ms),
            ("client.overall_timeout_ms", client.overall_timeout_ms),
            ("client.retry.max_attempts", u64::from(client.retry.max_attempts)),
            (
                "client.supervisor.spawn_attempts",
                u64::from(client.supervisor.spawn_attempts),
            ),
            (
                "client.supervisor.handshake_timeout_ms",
                client.supervisor.handshake_timeout_ms,
            ),
            (
                "client.supervisor.probe_timeout_ms",
                client.supervisor.probe_timeout_ms,
            ),
        ];
        for (field, value) in numbers {
            if value == 0 {
                issues.push(ConfigIssue::error(ConfigValidationError::ZeroValue {
                    field: field.to_string(),
                }));
            }
        }
        for (name, tool) in &self.server.tools {
            if tool.timeout_ms == 0 {
                issues.push(ConfigIssue::error(ConfigValidationError::ZeroValue {
                    field: format!("server.tools.{}.timeout_ms", name),
                }));
            }
        }

        // 2. Empty commands
        if client.enabled && client.command.trim().is_empty() {
            issues.push(ConfigIssue::error(ConfigValidationError::EmptyCommand {
                field: "client.command".to_string(),
            }));
        }
        for (name, tool) in &self.server.tools {
            if tool.command.trim().is_empty() {
                issues.push(ConfigIssue::error(ConfigValidationError::EmptyCommand {
                    field: format!("server.tools.{}.command", name),
                }));
            }
        }

        // 3. Grants for tools that do not exist
        if !self.server.tools.is_empty() {
            for (caller, tools) in &self.server.allowlist {
                for tool in tools {
                    if !self.server.tools.contains_key(tool) {
                        issues.push(ConfigIssue::warning(
                            ConfigValidationError::UnconfiguredTool {
                                caller: caller.clone(),
                                tool: tool.clone(),
                            },
                        ));
                    }
                }
            }
        }

        // 4. Client scopes the server would reject anyway
        if !self.server.allowlist.is_empty() {
            for (caller, scope) in &client.callers {
                let granted = self.server.allowlist.get(caller);
                for tool in &scope.tools {
                    if !granted.is_some_and(|g| g.contains(tool)) {
                        issues.push(ConfigIssue::warning(
                            ConfigValidationError::ScopeExceedsAllowlist {
                                caller: caller.clone(),
                                tool: tool.clone(),
                            },
                        ));
                    }
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[client]
enabled = true
command = "toolgate serve --config /etc/toolgate.toml"
call_timeout_ms = 5000

[client.retry]
max_attempts = 5

[client.callers.personal]
tools = ["create_event"]

[server]
name = "calendar"

[server.allowlist]
personal = ["create_event"]

[server.tools.create_event]
description = "Create a calendar event"
command = "./create-event"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.client.enabled);
        assert_eq!(config.client.call_timeout_ms, 5000);
        assert_eq!(config.client.retry.max_attempts, 5);
        assert_eq!(config.client.retry.base_delay_ms, 200);
        assert_eq!(config.server.name, "calendar");
        assert_eq!(config.server.tools["create_event"].description, "Create a calendar event");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(!config.client.enabled);
        assert_eq!(config.client.command, "toolgate serve");
        assert!(config.server.allowlist.is_empty());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_zero_values_are_errors() {
        let mut config = FileConfig::default();
        config.client.call_timeout_ms = 0;
        config.client.retry.max_attempts = 0;

        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Error));
        assert_eq!(issues[0].message(), "client.call_timeout_ms must be greater than 0");
    }

    #[test]
    fn test_validate_empty_tool_command() {
        let mut config = FileConfig::default();
        config
            .server
            .tools
            .insert("search_docs".to_string(), FileToolConfig::default());

        let issues = config.validate();
        assert_eq!(
            issues,
            vec![ConfigIssue::error(ConfigValidationError::EmptyCommand {
                field: "server.tools.search_docs.command".to_string(),
            })]
        );
    }

    #[test]
    fn test_validate_grant_for_unconfigured_tool_warns() {
        let config: FileConfig = toml::from_str(
            r#"
[server.allowlist]
command = ["search_docs", "create_event"]

[server.tools.search_docs]
command = "cat"
"#,
        )
        .unwrap();

        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message().contains("'create_event'"));
    }

    #[test]
    fn test_validate_scope_wider_than_allowlist_warns() {
        let config: FileConfig = toml::from_str(
            r#"
[client.callers.command]
tools = ["search_docs", "create_event"]

[server.allowlist]
command = ["search_docs"]
"#,
        )
        .unwrap();

        let issues = config.validate();
        assert_eq!(
            issues,
            vec![ConfigIssue::warning(
                ConfigValidationError::ScopeExceedsAllowlist {
                    caller: "command".to_string(),
                    tool: "create_event".to_string(),
                }
            )]
        );
    }
}
