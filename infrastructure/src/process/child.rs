//! Tool server as a child process.
//!
//! [`ChildProcessConnector`] launches the configured server command through
//! the platform shell. The child's stdin/stdout carry the line protocol; its
//! stderr is drained into the `debug` log so it can never fill up and block
//! the server.
//!
//! Shutdown is graceful first: stdin is closed (the server sees end of input
//! and exits), then SIGTERM, then a hard kill once the grace period is spent.

use crate::process::shell::shell_command;
use crate::transport::LineTransport;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;
use toolgate_application::ports::channel::{ChannelConnector, RpcConnection};
use toolgate_domain::TransportError;
use tracing::{debug, info, warn};

/// How long a server gets after SIGTERM before it is killed.
const TERMINATE_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ChildProcessConnector {
    command: String,
    envs: Vec<(String, String)>,
}

impl ChildProcessConnector {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            envs: Vec::new(),
        }
    }

    /// Extra environment for every server this connector spawns.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl ChannelConnector for ChildProcessConnector {
    async fn connect(&self) -> Result<Box<dyn RpcConnection>, TransportError> {
        let command_line = self.command.trim();
        if command_line.is_empty() {
            return Err(TransportError::Io("tool server command is empty".to_string()));
        }
        debug!("Spawning tool server: {}", command_line);

        let mut cmd = shell_command(command_line);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|e| {
            TransportError::Io(format!("failed to spawn '{}': {}", command_line, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Io("failed to capture server stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Io("failed to capture server stdout".to_string()))?;
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "toolgate::server", "{}", line);
                }
            })
        });

        info!(pid = child.id(), "Tool server started");

        Ok(Box::new(ChildConnection {
            transport: LineTransport::new(BufReader::new(stdout), stdin),
            child,
            stderr_task,
            closed: false,
        }))
    }
}

/// Connection to one running server process.
pub struct ChildConnection {
    transport: LineTransport<BufReader<ChildStdout>, ChildStdin>,
    child: Child,
    stderr_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl ChildConnection {
    #[cfg(unix)]
    fn terminate(&self) {
        if let Some(pid) = self.child.id() {
            // SAFETY: plain signal delivery to a pid we spawned and have not reaped.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self) {}
}

#[async_trait]
impl RpcConnection for ChildConnection {
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.transport.send(line).await
    }

    async fn receive_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        self.transport.receive_line(timeout).await
    }

    async fn close(&mut self, grace: Duration) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.transport.close().await;

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Tool server exited"),
            Ok(Err(e)) => warn!("Failed to wait for tool server: {}", e),
            Err(_) => {
                self.terminate();
                if tokio::time::timeout(TERMINATE_WAIT, self.child.wait())
                    .await
                    .is_err()
                {
                    warn!("Tool server did not exit after SIGTERM, killing it");
                    let _ = self.child.kill().await;
                }
            }
        }

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

impl Drop for ChildConnection {
    fn drop(&mut self) {
        if !self.closed {
            debug!("ChildConnection dropping, killing tool server process");
            let _ = self.child.start_kill();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_lines_round_trip_through_child() {
        let connector = ChildProcessConnector::new("cat");
        let mut conn = connector.connect().await.unwrap();

        conn.send_line(r#"{"id":1,"result":true}"#).await.unwrap();
        let line = conn.receive_line(Duration::from_secs(5)).await.unwrap();
        assert_eq!(line, r#"{"id":1,"result":true}"#);

        conn.close(Duration::from_secs(1)).await;
        conn.close(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_exited_server_is_end_of_stream() {
        let connector = ChildProcessConnector::new("echo starting >&2; exit 3");
        let mut conn = connector.connect().await.unwrap();
        assert_eq!(
            conn.receive_line(Duration::from_secs(5)).await,
            Err(TransportError::EndOfStream)
        );
        conn.close(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_stubborn_server_is_killed_after_grace() {
        let connector = ChildProcessConnector::new("trap '' TERM; while true; do sleep 1; done");
        let mut conn = connector.connect().await.unwrap();

        let started = Instant::now();
        conn.close(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_env_reaches_server() {
        let connector = ChildProcessConnector::new("echo \"$TOOLGATE_CONFIG\"")
            .with_env("TOOLGATE_CONFIG", "/etc/toolgate/custom.toml");
        let mut conn = connector.connect().await.unwrap();

        let line = conn.receive_line(Duration::from_secs(5)).await.unwrap();
        assert_eq!(line, "/etc/toolgate/custom.toml");
        conn.close(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let connector = ChildProcessConnector::new("   ");
        assert!(matches!(
            connector.connect().await,
            Err(TransportError::Io(_))
        ));
    }
}
