//! Server configuration from TOML (`[server]` section)
//!
//! The allowlist is the only authority on who may call what. A caller with
//! no entry gets nothing.
//!
//! ```toml
//! [server.allowlist]
//! personal = ["create_event", "list_agenda", "propose_slots"]
//! command = ["search_docs"]
//!
//! [server.tools.search_docs]
//! description = "Search project documentation"
//! command = "./scripts/search-docs"
//! timeout_ms = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toolgate_application::ServerInfo;
use toolgate_domain::{CapabilityAllowlist, PROTOCOL_VERSION};

/// A tool backed by an external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolConfig {
    pub description: String,
    /// Shell command; receives the arguments as JSON on stdin
    pub command: String,
    pub timeout_ms: u64,
}

impl Default for FileToolConfig {
    fn default() -> Self {
        Self {
            description: String::new(),
            command: String::new(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub name: String,
    pub protocol_version: String,
    /// caller -> tools it may invoke
    pub allowlist: BTreeMap<String, Vec<String>>,
    pub tools: BTreeMap<String, FileToolConfig>,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            name: "toolgate".to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            allowlist: BTreeMap::new(),
            tools: BTreeMap::new(),
        }
    }
}

impl FileServerConfig {
    pub fn to_allowlist(&self) -> CapabilityAllowlist {
        CapabilityAllowlist::from_entries(&self.allowlist)
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            protocol_version: self.protocol_version.clone(),
            ..ServerInfo::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_domain::CallerId;

    #[test]
    fn test_parse_allowlist_and_tools() {
        let config: FileServerConfig = toml::from_str(
            r#"
[allowlist]
personal = ["create_event"]
command = ["search_docs"]

[tools.search_docs]
description = "Search docs"
command = "cat"
"#,
        )
        .unwrap();

        let allowlist = config.to_allowlist();
        let command = CallerId::new("command").unwrap();
        assert!(allowlist.is_granted(&command, "search_docs"));
        assert!(!allowlist.is_granted(&command, "create_event"));

        let tool = &config.tools["search_docs"];
        assert_eq!(tool.command, "cat");
        assert_eq!(tool.timeout_ms, 30_000);
    }

    #[test]
    fn test_default_has_no_grants() {
        let config = FileServerConfig::default();
        assert!(config.to_allowlist().is_empty());
        assert_eq!(config.server_info().protocol_version, PROTOCOL_VERSION);
    }
}
