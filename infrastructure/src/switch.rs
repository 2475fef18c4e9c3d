//! Environment-backed feature switch.
//!
//! `TOOLGATE_ENABLED` wins over the configured value when it holds a
//! recognizable flag; anything else falls back to the configuration.

use toolgate_application::ports::feature_switch::FeatureSwitch;
use tracing::warn;

pub const ENABLED_VAR: &str = "TOOLGATE_ENABLED";

/// Parse a boolean-ish flag: `1/true/yes/on` or `0/false/no/off`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct EnvFeatureSwitch {
    variable: String,
    configured: bool,
}

impl EnvFeatureSwitch {
    pub fn new(configured: bool) -> Self {
        Self::with_variable(ENABLED_VAR, configured)
    }

    pub fn with_variable(variable: impl Into<String>, configured: bool) -> Self {
        Self {
            variable: variable.into(),
            configured,
        }
    }
}

impl FeatureSwitch for EnvFeatureSwitch {
    fn is_enabled(&self) -> bool {
        let Ok(raw) = std::env::var(&self.variable) else {
            return self.configured;
        };
        parse_flag(&raw).unwrap_or_else(|| {
            warn!(
                "Ignoring {}={:?}; expected 1/0, true/false, yes/no or on/off",
                self.variable, raw
            );
            self.configured
        })
    }
}
