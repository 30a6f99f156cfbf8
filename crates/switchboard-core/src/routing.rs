// ABOUTME: Routing strategy contract and the default health-filtered round-robin.
// ABOUTME: Strategies pick one address from a snapshot of per-server health.

use crate::health::HealthState;

/// Health of one pool server as seen at routing time.
///
/// Servers with no cached connection yet report `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHealth {
    pub address: String,
    pub health: HealthState,
}

/// Snapshot handed to a strategy for one routing decision.
#[derive(Debug, Clone)]
pub struct RouteContext<'a> {
    /// All pool servers in insertion order, with current health.
    pub servers: &'a [ServerHealth],
    /// Caller-supplied routing parameters; interpretation is strategy-defined.
    pub params: Option<&'a serde_json::Value>,
    /// Pool-wide call counter. Advances once per routing decision and wraps
    /// on overflow; shared between default and custom strategies.
    pub call_count: u64,
}

/// Picks one target address for a call.
///
/// A strategy must be deterministic for identical inputs so that callers can
/// rely on same-params-same-server affinity. Returning `None` means no server
/// is available; returning an address that is not in the snapshot fails the
/// call as an invalid route.
pub trait RoutingStrategy: Send + Sync {
    fn select(&self, ctx: &RouteContext<'_>) -> Option<String>;
}

/// Default strategy: round-robin over routable servers in insertion order.
///
/// Servers in `TransientFailure` or `Shutdown` are skipped; `Idle`,
/// `Connecting`, and `Ready` servers are all candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl RoutingStrategy for RoundRobin {
    fn select(&self, ctx: &RouteContext<'_>) -> Option<String> {
        let candidates: Vec<&ServerHealth> = ctx
            .servers
            .iter()
            .filter(|s| s.health.is_routable())
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = (ctx.call_count % candidates.len() as u64) as usize;
        Some(candidates[index].address.clone())
    }
}
