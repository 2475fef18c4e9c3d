//! Configuration file loading for toolgate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLGATE_*` environment variables
//! 2. `--config <path>` specified file, or `TOOLGATE_CONFIG`
//! 3. Project root: `./toolgate.toml` or `./.toolgate.toml`
//! 4. Global: `~/.config/toolgate/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, ConfigValidationError, FileCallerConfig, FileClientConfig, FileConfig,
    FileRetryConfig, FileServerConfig, FileSupervisorConfig, FileToolConfig, Severity,
};
pub use loader::{CONFIG_PATH_VAR, ConfigLoader};
