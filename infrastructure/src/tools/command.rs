//! Command-backed tools.
//!
//! A [`CommandTool`] runs a shell command once per call. The call arguments
//! (including `caller`) are written to the command's stdin as one JSON object.
//! Stdout becomes the result: parsed as JSON when it is JSON, otherwise the
//! trimmed text. A non-zero exit is a tool error carrying stderr.

use crate::process::shell::shell_command;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use toolgate_application::ports::tool_handler::ToolHandler;
use toolgate_domain::ToolError;
use toolgate_domain::util::truncate_str;
use tracing::debug;

/// Default timeout for one command run
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum output size (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CommandTool {
    name: String,
    command: String,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl CommandTool {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
            working_dir: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    async fn run(&self, input: Vec<u8>) -> Result<std::process::Output, ToolError> {
        let mut cmd = shell_command(&self.command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            ToolError::new(format!("Failed to execute command: {}", e))
        })?;

        let stdin = child.stdin.take();
        let write_input = async move {
            if let Some(mut stdin) = stdin {
                // The command may exit without reading its input.
                let _ = stdin.write_all(&input).await;
                let _ = stdin.shutdown().await;
            }
        };
        let ((), output) = tokio::join!(write_input, child.wait_with_output());
        output.map_err(|e| ToolError::new(format!("Failed to wait for command: {}", e)))
    }
}

#[async_trait]
impl ToolHandler for CommandTool {
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let input = serde_json::to_vec(&Value::Object(arguments))
            .map_err(|e| ToolError::invalid_argument(e.to_string()))?;

        debug!(tool = self.name.as_str(), "Running command tool");
        let output = match tokio::time::timeout(self.timeout, self.run(input)).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(ToolError::timeout(format!(
                    "{} after {}ms",
                    self.name,
                    self.timeout.as_millis()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = truncate_str(stderr.trim(), MAX_OUTPUT_SIZE);
            return Err(if stderr.is_empty() {
                ToolError::new(format!(
                    "Command failed with exit code: {:?}",
                    output.status.code()
                ))
            } else {
                ToolError::new(stderr)
            });
        }

        if output.stdout.len() > MAX_OUTPUT_SIZE {
            return Err(ToolError::new(format!(
                "{} produced {} bytes of output, limit is {}",
                self.name,
                output.stdout.len(),
                MAX_OUTPUT_SIZE
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
    }
}
