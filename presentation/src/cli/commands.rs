//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored output
    Text,
    /// One JSON document on stdout
    Json,
}

/// CLI arguments for toolgate
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about = "Capability-gated tool server and client")]
#[command(long_about = r#"
toolgate runs privileged tools in a separate server process and lets callers
invoke them over a newline-delimited JSON channel. Every call names its
caller; the server checks it against a static allowlist before the tool runs.

Configuration files are loaded from (in priority order):
1. TOOLGATE_* environment variables (e.g. TOOLGATE_CLIENT__CALL_TIMEOUT_MS)
2. --config <path>     Explicit config file
3. ./toolgate.toml     Project-level config
4. ~/.config/toolgate/config.toml   Global config

Tool invocation is disabled unless client.enabled = true or TOOLGATE_ENABLED=1.

Example:
  toolgate serve --config server.toml
  toolgate call search_docs --caller command --args '{"query":"tokio"}'
  toolgate list --caller personal --output json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Append invocation events as JSON lines to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub event_log: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the configured tools on stdin/stdout
    Serve,

    /// Invoke one tool through a server process
    Call {
        /// Tool name
        tool: String,

        /// Caller identity the server authorizes against
        #[arg(short, long)]
        caller: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, value_name = "JSON", default_value = "{}")]
        args: String,
    },

    /// List the tools a server offers
    List {
        /// Show only the tools this caller's scope allows
        #[arg(short, long)]
        caller: Option<String>,
    },
}

/// Parse `--args`: a JSON object, or empty for no arguments.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!(
            "--args must be a JSON object, got {}",
            toolgate_domain::util::json_type_name(&other)
        )),
        Err(e) => Err(format!("--args is not valid JSON: {}", e)),
    }
}
