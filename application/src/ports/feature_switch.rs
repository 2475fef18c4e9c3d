//! Feature switch port
//!
//! Tool invocation is off unless explicitly enabled. The switch is read once
//! per call, so flipping it takes effect on the next invocation.

pub trait FeatureSwitch: Send + Sync {
    fn is_enabled(&self) -> bool;
}

/// A switch fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct StaticSwitch(pub bool);

impl FeatureSwitch for StaticSwitch {
    fn is_enabled(&self) -> bool {
        self.0
    }
}
