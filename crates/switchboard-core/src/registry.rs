// ABOUTME: Process-wide registry mapping logical service names to pools or fixed connections.
// ABOUTME: Duplicate names are refused (returns false), never overwritten.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::accessor::ServiceAccessor;
use crate::connector::{Connection, Connector};
use crate::error::SwitchboardError;
use crate::name::ServiceName;
use crate::pool::ServicePool;

/// A value registered under a logical service name.
enum RegistryEntry<C: Connector> {
    Pool(ServicePool<C>),
    Connection(C::Conn),
}

impl<C: Connector> Clone for RegistryEntry<C> {
    fn clone(&self) -> Self {
        match self {
            RegistryEntry::Pool(pool) => RegistryEntry::Pool(pool.clone()),
            RegistryEntry::Connection(conn) => RegistryEntry::Connection(conn.clone()),
        }
    }
}

impl<C: Connector> RegistryEntry<C> {
    fn close(&self) {
        match self {
            RegistryEntry::Pool(pool) => pool.close(),
            RegistryEntry::Connection(conn) => conn.close(),
        }
    }
}

struct RegistryInner<C: Connector> {
    entries: Mutex<HashMap<String, RegistryEntry<C>>>,
}

/// Registry resolving logical service names to routed instances.
///
/// Maps `namespace.ShortName` keys to either a [`ServicePool`] or a single
/// fixed connection. The registry is a cheap-to-clone handle; all clones share
/// the same entries. Applications typically create one at startup and pass it
/// to whatever needs service resolution.
pub struct ServiceRegistry<C: Connector> {
    inner: Arc<RegistryInner<C>>,
}

impl<C: Connector> Clone for ServiceRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connector> fmt::Debug for ServiceRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_names())
            .finish()
    }
}

impl<C: Connector> Default for ServiceRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ServiceRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a pool under its own service name.
    /// Returns false without overwriting if the name is taken.
    pub fn register(&self, pool: ServicePool<C>) -> bool {
        let name = pool.service_name().qualified();
        self.insert(name, RegistryEntry::Pool(pool))
    }

    /// Register a single fixed connection under an explicit name.
    /// Returns false without overwriting if the name is taken.
    pub fn register_connection(&self, name: ServiceName, connection: C::Conn) -> bool {
        self.insert(name.qualified(), RegistryEntry::Connection(connection))
    }

    fn insert(&self, name: String, entry: RegistryEntry<C>) -> bool {
        let mut entries = self.entries();
        match entries.entry(name) {
            Entry::Occupied(occupied) => {
                tracing::warn!(service = %occupied.key(), "service already registered");
                false
            }
            Entry::Vacant(vacant) => {
                tracing::info!(service = %vacant.key(), "service registered");
                vacant.insert(entry);
                true
            }
        }
    }

    /// Remove a registration. Returns false if nothing is registered under
    /// `name`. With `close_connection`, the underlying pool or connection is
    /// closed before the entry is removed.
    pub fn deregister(&self, name: &str, close_connection: bool) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get(name) else {
            return false;
        };
        if close_connection {
            entry.close();
        }
        entries.remove(name);
        tracing::info!(service = %name, "service deregistered");
        true
    }

    /// Resolve a logical name to a live connection.
    ///
    /// The name must parse as `namespace.ShortName` (split on the last dot).
    /// A registered pool routes the call with `params`; a registered fixed
    /// connection is returned as-is (`params` ignored).
    pub async fn get_instance_of(
        &self,
        name: &str,
        params: Option<&serde_json::Value>,
    ) -> Result<C::Conn, SwitchboardError> {
        let service: ServiceName = name.parse()?;
        let key = service.qualified();
        let entry = self.entries().get(&key).cloned();
        match entry {
            Some(RegistryEntry::Pool(pool)) => pool.get_instance(params).await,
            Some(RegistryEntry::Connection(conn)) => Ok(conn),
            None => Err(SwitchboardError::ServiceNotRegistered { name: key }),
        }
    }

    /// Close every registered pool and connection. Entries stay registered;
    /// pools reconnect on their next use.
    pub fn close(&self) {
        let entries = self.entries();
        for entry in entries.values() {
            entry.close();
        }
        tracing::debug!(services = entries.len(), "registry entries closed");
    }

    /// Whether anything is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    /// Registered service names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries().keys().cloned().collect();
        names.sort();
        names
    }

    /// Root accessor for chained traversal (`registry.accessor().get("pkg")`).
    pub fn accessor(&self) -> ServiceAccessor<C> {
        ServiceAccessor::new(self.clone())
    }

    /// Root accessor whose path starts at `namespace`.
    pub fn accessor_with_root(&self, namespace: impl Into<String>) -> ServiceAccessor<C> {
        ServiceAccessor::with_root(self.clone(), namespace)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, RegistryEntry<C>>> {
        self.inner
            .entries
            .lock()
            .expect("registry entries lock poisoned")
    }
}
