//! Capability allowlist - which caller may invoke which tool.
//!
//! The allowlist is static configuration: built once, then only read. There
//! is no wildcard and no default grant; a caller that is not listed can use
//! nothing.

use crate::core::caller::CallerId;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Reasons an authorization check fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Missing 'caller' for tool invocation")]
    MissingCaller,

    #[error("Caller '{caller}' is not allowed to use tool '{tool}'")]
    NotGranted { caller: String, tool: String },
}

/// Mapping from caller identity to the set of tool names it may invoke.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityAllowlist {
    grants: BTreeMap<CallerId, BTreeSet<String>>,
}

impl CapabilityAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `tools` to `caller` (builder pattern). Grants accumulate.
    pub fn grant<I, S>(mut self, caller: CallerId, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.grants.entry(caller).or_default();
        for tool in tools {
            let tool = tool.into();
            let tool = tool.trim();
            if !tool.is_empty() {
                entry.insert(tool.to_string());
            }
        }
        self
    }

    /// Build from raw `caller -> [tools]` entries, skipping blank caller names.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    {
        entries
            .into_iter()
            .fold(Self::new(), |acc, (caller, tools)| match CallerId::new(caller.as_str()) {
                Some(caller) => acc.grant(caller, tools.iter().cloned()),
                None => acc,
            })
    }

    /// Authoritative check. `caller` is `None` when the request carried no label.
    pub fn authorize(&self, caller: Option<&CallerId>, tool: &str) -> Result<(), AuthorizationError> {
        let caller = caller.ok_or(AuthorizationError::MissingCaller)?;
        if self.is_granted(caller, tool) {
            Ok(())
        } else {
            Err(AuthorizationError::NotGranted {
                caller: caller.to_string(),
                tool: tool.to_string(),
            })
        }
    }

    pub fn is_granted(&self, caller: &CallerId, tool: &str) -> bool {
        self.grants
            .get(caller)
            .is_some_and(|tools| tools.contains(tool))
    }

    /// Tools granted to `caller`, in name order.
    pub fn tools_for(&self, caller: &CallerId) -> Vec<&str> {
        self.grants
            .get(caller)
            .map(|tools| tools.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn callers(&self) -> impl Iterator<Item = &CallerId> {
        self.grants.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.values().all(BTreeSet::is_empty)
    }
}
