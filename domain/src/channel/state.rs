//! Channel lifecycle state machine
//!
//! ```text
//! Unstarted ──▶ Spawning ──▶ Handshaking ──▶ Ready
//!     ▲            │              │            │
//!     │            ▼              ▼            ▼
//!     └──────────── reset ◀──────────────── Degraded
//!
//! any state ──▶ Closed (shutdown)
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of the channel to the tool server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// No child process. The next `ensure_ready` spawns one.
    #[default]
    Unstarted,
    /// A child process is being launched.
    Spawning,
    /// The child runs; the `initialize` handshake is in progress.
    Handshaking,
    /// Handshake succeeded; calls may be issued.
    Ready,
    /// A failure was detected on a ready channel; a reset is pending.
    Degraded,
    /// Shut down explicitly. Terminal.
    Closed,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Unstarted => "unstarted",
            ChannelState::Spawning => "spawning",
            ChannelState::Handshaking => "handshaking",
            ChannelState::Ready => "ready",
            ChannelState::Degraded => "degraded",
            ChannelState::Closed => "closed",
        }
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: ChannelState) -> bool {
        use ChannelState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Unstarted, Spawning)
            | (Spawning, Handshaking)
            | (Handshaking, Ready)
            | (Ready, Degraded)
            | (Spawning, Unstarted)
            | (Handshaking, Unstarted)
            | (Degraded, Unstarted) => true,
            _ => false,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ChannelState::Ready)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelState::Closed)
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
