// ABOUTME: Health states reported by connection handles.
// ABOUTME: Used by routing to filter out servers that cannot take new calls.

use std::fmt;

/// Lifecycle state of a connection to one server address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthState {
    /// No connection attempt has been made yet.
    Idle,
    /// A connection attempt is in progress.
    Connecting,
    /// Connected and usable.
    Ready,
    /// Recently failed; may recover.
    TransientFailure,
    /// Closed; terminal.
    Shutdown,
}

impl HealthState {
    /// Whether the default routing strategy considers this state a candidate.
    ///
    /// Addresses without a cached connection count as `Idle` and are always
    /// candidates; only `TransientFailure` and `Shutdown` are filtered out.
    pub fn is_routable(&self) -> bool {
        !matches!(self, HealthState::TransientFailure | HealthState::Shutdown)
    }

    /// Short lowercase label for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Idle => "idle",
            HealthState::Connecting => "connecting",
            HealthState::Ready => "ready",
            HealthState::TransientFailure => "transient-failure",
            HealthState::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
