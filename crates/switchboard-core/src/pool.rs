// ABOUTME: Per-service connection pool with lazy per-address connection caching.
// ABOUTME: A routing strategy picks the address for each call; one cached connection per address.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::connector::{Connection, Connector};
use crate::error::SwitchboardError;
use crate::health::HealthState;
use crate::name::ServiceName;
use crate::routing::{RouteContext, RoundRobin, RoutingStrategy, ServerHealth};
use crate::server::ServerDescriptor;

/// Default deadline for establishing a new connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool-wide configuration.
#[derive(Clone)]
pub struct PoolConfig {
    /// Deadline for new connections; per-server options override this.
    pub connect_timeout: Duration,
    /// Strategy consulted on every `get_instance` call.
    pub strategy: Arc<dyn RoutingStrategy>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            strategy: Arc::new(RoundRobin),
        }
    }
}

impl PoolConfig {
    /// Create a config with the default timeout and round-robin routing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool-wide connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Replace the routing strategy.
    pub fn with_strategy(mut self, strategy: impl RoutingStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

struct PoolState<C: Connector> {
    descriptors: Vec<ServerDescriptor>,
    connections: HashMap<String, C::Conn>,
    call_count: u64,
}

impl<C: Connector> PoolState<C> {
    /// Per-server health as routing sees it: live handle state when cached,
    /// `Idle` for addresses never connected to.
    fn health_snapshot(&self) -> Vec<ServerHealth> {
        self.descriptors
            .iter()
            .map(|d| ServerHealth {
                address: d.address.clone(),
                health: self
                    .connections
                    .get(&d.address)
                    .map(|c| c.health())
                    .unwrap_or(HealthState::Idle),
            })
            .collect()
    }
}

struct PoolInner<C: Connector> {
    service: ServiceName,
    connector: C,
    config: PoolConfig,
    state: Mutex<PoolState<C>>,
}

/// Connection pool for one logical service.
///
/// Holds an ordered list of server descriptors and lazily opens one connection
/// per address, the first time routing selects it. Connections are cached and
/// reused until `close()`. The pool is a cheap-to-clone handle; all clones
/// share the same state.
pub struct ServicePool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for ServicePool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connector> fmt::Debug for ServicePool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePool")
            .field("service", &self.inner.service.qualified())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ServicePool<C> {
    /// Create a pool with default config (round-robin routing).
    ///
    /// An empty server list is legal; routing then fails until servers are
    /// added.
    pub fn new(service: ServiceName, connector: C, servers: Vec<ServerDescriptor>) -> Self {
        Self::with_config(service, connector, servers, PoolConfig::default())
    }

    /// Create a pool with explicit configuration.
    pub fn with_config(
        service: ServiceName,
        connector: C,
        servers: Vec<ServerDescriptor>,
        config: PoolConfig,
    ) -> Self {
        // Address is the identity key; keep the first descriptor per address
        let mut descriptors: Vec<ServerDescriptor> = Vec::new();
        for server in servers {
            if !descriptors.iter().any(|d| d.address == server.address) {
                descriptors.push(server);
            }
        }
        Self {
            inner: Arc::new(PoolInner {
                service,
                connector,
                config,
                state: Mutex::new(PoolState {
                    descriptors,
                    connections: HashMap::new(),
                    call_count: 0,
                }),
            }),
        }
    }

    /// The logical service this pool serves.
    pub fn service_name(&self) -> &ServiceName {
        &self.inner.service
    }

    /// Add a server. Returns false if the address is already present.
    /// Never connects eagerly.
    pub fn add_server(&self, server: ServerDescriptor) -> bool {
        let mut state = self.state();
        if state.descriptors.iter().any(|d| d.address == server.address) {
            return false;
        }
        tracing::debug!(
            service = %self.inner.service,
            address = %server.address,
            "server added"
        );
        state.descriptors.push(server);
        true
    }

    /// Remove a server. Returns false if the address is not present.
    ///
    /// The cached connection for that address, if any, is left open so calls
    /// already routed there keep working; future routing no longer selects it.
    pub fn remove_server(&self, address: &str) -> bool {
        let mut state = self.state();
        let before = state.descriptors.len();
        state.descriptors.retain(|d| d.address != address);
        let removed = state.descriptors.len() != before;
        if removed {
            tracing::debug!(
                service = %self.inner.service,
                address = %address,
                "server removed"
            );
        }
        removed
    }

    /// Route one call: pick an address, then return the cached connection for
    /// it, connecting first if this address was never used.
    ///
    /// `params` is forwarded to the routing strategy untouched. Fails with
    /// `NoAvailableServer` when the strategy yields nothing, `InvalidRoute`
    /// when it yields an unknown address, and `ConnectTimeout` when a fresh
    /// connection misses its deadline. Failed connection attempts are not
    /// cached; the next call retries from scratch.
    pub async fn get_instance(
        &self,
        params: Option<&serde_json::Value>,
    ) -> Result<C::Conn, SwitchboardError> {
        let (descriptor, timeout) = {
            let mut state = self.state();
            let snapshot = state.health_snapshot();
            let selected = self.inner.config.strategy.select(&RouteContext {
                servers: &snapshot,
                params,
                call_count: state.call_count,
            });
            // One decision per call, counted even when it fails
            state.call_count = state.call_count.wrapping_add(1);

            let Some(address) = selected else {
                tracing::warn!(service = %self.inner.service, "no available server");
                return Err(SwitchboardError::NoAvailableServer {
                    service: self.inner.service.qualified(),
                });
            };

            let Some(descriptor) = state.descriptors.iter().find(|d| d.address == address) else {
                tracing::warn!(
                    service = %self.inner.service,
                    address = %address,
                    "strategy selected unknown address"
                );
                return Err(SwitchboardError::InvalidRoute {
                    service: self.inner.service.qualified(),
                    address,
                });
            };
            let descriptor = descriptor.clone();

            if let Some(conn) = state.connections.get(&address) {
                return Ok(conn.clone());
            }

            let timeout = descriptor
                .connect_timeout()
                .unwrap_or(self.inner.config.connect_timeout);
            (descriptor, timeout)
        };

        // Connect outside the lock so other callers keep routing meanwhile
        let connection = match tokio::time::timeout(
            timeout,
            self.inner.connector.connect(&self.inner.service, &descriptor),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(err)) => {
                tracing::warn!(
                    service = %self.inner.service,
                    address = %descriptor.address,
                    error = %err,
                    "connect failed"
                );
                return Err(err);
            }
            Err(_) => {
                tracing::warn!(
                    service = %self.inner.service,
                    address = %descriptor.address,
                    timeout = ?timeout,
                    "connect timed out"
                );
                return Err(SwitchboardError::ConnectTimeout {
                    address: descriptor.address.clone(),
                    timeout,
                });
            }
        };

        let mut state = self.state();
        if let Some(existing) = state.connections.get(&descriptor.address) {
            // Another caller connected to this address first; keep theirs
            connection.close();
            return Ok(existing.clone());
        }
        tracing::debug!(
            service = %self.inner.service,
            address = %descriptor.address,
            "connection established"
        );
        state
            .connections
            .insert(descriptor.address.clone(), connection.clone());
        Ok(connection)
    }

    /// Close every cached connection and drop it from the cache.
    ///
    /// The server list is untouched; the pool stays usable and later calls
    /// reconnect.
    pub fn close(&self) {
        let mut state = self.state();
        for conn in state.connections.values() {
            conn.close();
        }
        let closed = state.connections.len();
        state.connections.clear();
        if closed > 0 {
            tracing::debug!(
                service = %self.inner.service,
                connections = closed,
                "pool connections closed"
            );
        }
    }

    /// Number of servers currently in the pool.
    pub fn server_count(&self) -> usize {
        self.state().descriptors.len()
    }

    /// Server addresses in insertion order.
    pub fn servers(&self) -> Vec<String> {
        self.state()
            .descriptors
            .iter()
            .map(|d| d.address.clone())
            .collect()
    }

    /// The health view routing sees: live state for cached connections,
    /// `Idle` for addresses never connected to.
    pub fn health_snapshot(&self) -> Vec<ServerHealth> {
        self.state().health_snapshot()
    }

    fn state(&self) -> MutexGuard<'_, PoolState<C>> {
        self.inner.state.lock().expect("pool state lock poisoned")
    }

    #[cfg(test)]
    fn call_count(&self) -> u64 {
        self.state().call_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerOptions;
    use crate::testing::MockConnector;

    fn service(name: &str) -> ServiceName {
        name.parse().unwrap()
    }

    fn pool_with(servers: &[&str]) -> (ServicePool<MockConnector>, MockConnector) {
        let connector = MockConnector::new();
        let descriptors = servers.iter().map(|s| ServerDescriptor::new(*s)).collect();
        let pool = ServicePool::new(service("pkg.Greeter"), connector.clone(), descriptors);
        (pool, connector)
    }

    /// Strategy used by affinity tests: route by a "name" param.
    struct ByName {
        x_target: String,
        other_target: String,
    }

    impl RoutingStrategy for ByName {
        fn select(&self, ctx: &RouteContext<'_>) -> Option<String> {
            let name = ctx
                .params
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str());
            match name {
                Some("X") => Some(self.x_target.clone()),
                _ => Some(self.other_target.clone()),
            }
        }
    }

    #[tokio::test]
    async fn test_round_robin_visits_all_servers_in_order() {
        let (pool, connector) = pool_with(&["s1", "s2", "s3"]);
        let mut addresses = Vec::new();
        for _ in 0..6 {
            addresses.push(pool.get_instance(None).await.unwrap().address);
        }
        assert_eq!(addresses, ["s1", "s2", "s3", "s1", "s2", "s3"]);
        // Second cycle reused cached connections
        assert_eq!(connector.connect_count(), 3);
    }

    #[tokio::test]
    async fn test_add_server_never_connects() {
        let (pool, connector) = pool_with(&[]);
        assert!(pool.add_server(ServerDescriptor::new("s1")));
        assert!(pool.add_server(ServerDescriptor::new("s2")));
        assert_eq!(connector.connect_count(), 0);

        pool.get_instance(None).await.unwrap();
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_same_address_returns_cached_handle() {
        let (pool, connector) = pool_with(&["s1"]);
        let first = pool.get_instance(None).await.unwrap();
        let second = pool.get_instance(None).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_add_server_rejects_duplicate_address() {
        let (pool, _) = pool_with(&["s1"]);
        assert!(!pool.add_server(ServerDescriptor::new("s1")));
        assert!(pool.add_server(ServerDescriptor::new("s2")));
        assert_eq!(pool.server_count(), 2);
    }

    #[tokio::test]
    async fn test_construction_dedupes_addresses() {
        let (pool, _) = pool_with(&["s1", "s1", "s2"]);
        assert_eq!(pool.servers(), ["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_remove_server_returns_presence() {
        let (pool, _) = pool_with(&["s1"]);
        assert!(pool.remove_server("s1"));
        assert!(!pool.remove_server("s1"));
        assert_eq!(pool.server_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_server_keeps_cached_connection_open() {
        let (pool, _) = pool_with(&["s1", "s2"]);
        let handle = pool.get_instance(None).await.unwrap();
        assert_eq!(handle.address, "s1");

        assert!(pool.remove_server("s1"));
        assert_eq!(handle.health(), HealthState::Ready);

        // Future routing only sees s2
        for _ in 0..3 {
            let conn = pool.get_instance(None).await.unwrap();
            assert_eq!(conn.address, "s2");
        }
        // The removed server's handle is still ours to close
        handle.close();
        assert_eq!(handle.health(), HealthState::Shutdown);
    }

    #[tokio::test]
    async fn test_empty_pool_has_no_available_server() {
        let (pool, _) = pool_with(&[]);
        let err = pool.get_instance(None).await.unwrap_err();
        assert!(matches!(
            err,
            SwitchboardError::NoAvailableServer { ref service } if service == "pkg.Greeter"
        ));
    }

    #[tokio::test]
    async fn test_all_unhealthy_is_no_available_server() {
        let (pool, _) = pool_with(&["s1"]);
        let handle = pool.get_instance(None).await.unwrap();
        handle.set_health(HealthState::TransientFailure);

        let err = pool.get_instance(None).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::NoAvailableServer { .. }));
    }

    #[tokio::test]
    async fn test_unhealthy_server_skipped_until_it_recovers() {
        let (pool, _) = pool_with(&["s1", "s2"]);
        let s1 = pool.get_instance(None).await.unwrap();
        assert_eq!(s1.address, "s1");

        s1.set_health(HealthState::TransientFailure);
        assert_eq!(pool.get_instance(None).await.unwrap().address, "s2");
        assert_eq!(pool.get_instance(None).await.unwrap().address, "s2");

        s1.set_health(HealthState::Ready);
        // call_count is 3; with both candidates back, 3 % 2 selects s2, then s1
        assert_eq!(pool.get_instance(None).await.unwrap().address, "s2");
        assert_eq!(pool.get_instance(None).await.unwrap().address, "s1");
    }

    #[tokio::test]
    async fn test_custom_strategy_param_affinity() {
        let connector = MockConnector::new();
        let pool = ServicePool::with_config(
            service("pkg.Greeter"),
            connector.clone(),
            vec![ServerDescriptor::new("s1"), ServerDescriptor::new("s2")],
            PoolConfig::new().with_strategy(ByName {
                x_target: "s1".to_string(),
                other_target: "s2".to_string(),
            }),
        );

        let params = serde_json::json!({ "name": "X" });
        let first = pool.get_instance(Some(&params)).await.unwrap();
        let second = pool.get_instance(Some(&params)).await.unwrap();
        assert_eq!(first.address, "s1");
        assert_eq!(first.id, second.id);

        let other = serde_json::json!({ "name": "Y" });
        let third = pool.get_instance(Some(&other)).await.unwrap();
        assert_eq!(third.address, "s2");
    }

    #[tokio::test]
    async fn test_custom_strategy_unknown_address_is_invalid_route() {
        struct Stale;
        impl RoutingStrategy for Stale {
            fn select(&self, _ctx: &RouteContext<'_>) -> Option<String> {
                Some("bogus:1".to_string())
            }
        }

        let connector = MockConnector::new();
        let pool = ServicePool::with_config(
            service("pkg.Greeter"),
            connector,
            vec![ServerDescriptor::new("s1")],
            PoolConfig::new().with_strategy(Stale),
        );
        let err = pool.get_instance(None).await.unwrap_err();
        assert!(matches!(
            err,
            SwitchboardError::InvalidRoute { ref address, .. } if address == "bogus:1"
        ));
    }

    #[tokio::test]
    async fn test_custom_strategy_none_is_no_available_server() {
        struct Never;
        impl RoutingStrategy for Never {
            fn select(&self, _ctx: &RouteContext<'_>) -> Option<String> {
                None
            }
        }

        let connector = MockConnector::new();
        let pool = ServicePool::with_config(
            service("pkg.Greeter"),
            connector,
            vec![ServerDescriptor::new("s1")],
            PoolConfig::new().with_strategy(Never),
        );
        let err = pool.get_instance(None).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::NoAvailableServer { .. }));
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let connector = MockConnector::new();
        connector.set_delay(Duration::from_millis(200));
        let pool = ServicePool::with_config(
            service("pkg.Greeter"),
            connector.clone(),
            vec![ServerDescriptor::new("s1")],
            PoolConfig::new().with_connect_timeout(Duration::from_millis(20)),
        );

        let err = pool.get_instance(None).await.unwrap_err();
        assert!(matches!(
            err,
            SwitchboardError::ConnectTimeout { ref address, .. } if address == "s1"
        ));
    }

    #[tokio::test]
    async fn test_per_server_timeout_overrides_pool_default() {
        let connector = MockConnector::new();
        connector.set_delay(Duration::from_millis(200));
        let server = ServerDescriptor::new("s1")
            .with_options(ServerOptions::new().with_connect_timeout(Duration::from_millis(20)));
        let pool = ServicePool::with_config(
            service("pkg.Greeter"),
            connector,
            vec![server],
            PoolConfig::new().with_connect_timeout(Duration::from_secs(10)),
        );

        let err = pool.get_instance(None).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::ConnectTimeout { .. }));
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_cached() {
        let (pool, connector) = pool_with(&["s1"]);
        connector.fail_address("s1");

        let err = pool.get_instance(None).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::ConnectionFailed { .. }));

        connector.clear_failure("s1");
        let handle = pool.get_instance(None).await.unwrap();
        assert_eq!(handle.address, "s1");
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_cached_connection() {
        let (pool, connector) = pool_with(&["s1"]);
        connector.set_delay(Duration::from_millis(20));

        let a = tokio::spawn({
            let pool = pool.clone();
            async move { pool.get_instance(None).await.unwrap() }
        });
        let b = tokio::spawn({
            let pool = pool.clone();
            async move { pool.get_instance(None).await.unwrap() }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        // Both callers end up with the committed connection
        assert_eq!(a.id, b.id);
        let third = pool.get_instance(None).await.unwrap();
        assert_eq!(third.id, a.id);
    }

    #[tokio::test]
    async fn test_close_keeps_servers_and_reconnects() {
        let (pool, connector) = pool_with(&["s1"]);
        let first = pool.get_instance(None).await.unwrap();
        pool.close();
        assert_eq!(first.health(), HealthState::Shutdown);
        assert_eq!(pool.server_count(), 1);

        let second = pool.get_instance(None).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.health(), HealthState::Ready);
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_call_counter_advances_on_failed_calls() {
        let (pool, _) = pool_with(&[]);
        assert_eq!(pool.call_count(), 0);
        let _ = pool.get_instance(None).await;
        assert_eq!(pool.call_count(), 1);

        pool.add_server(ServerDescriptor::new("s1"));
        pool.get_instance(None).await.unwrap();
        assert_eq!(pool.call_count(), 2);
    }

    #[tokio::test]
    async fn test_health_snapshot_reports_idle_until_connected() {
        let (pool, _) = pool_with(&["s1", "s2"]);
        let snapshot = pool.health_snapshot();
        assert!(snapshot.iter().all(|s| s.health == HealthState::Idle));

        pool.get_instance(None).await.unwrap();
        let snapshot = pool.health_snapshot();
        assert_eq!(snapshot[0].address, "s1");
        assert_eq!(snapshot[0].health, HealthState::Ready);
        assert_eq!(snapshot[1].health, HealthState::Idle);
    }
}
