// ABOUTME: Chained accessor turning dotted service names into nested traversal.
// ABOUTME: Nodes are lazily built and cached; the registry stays the source of truth.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::connector::Connector;
use crate::error::SwitchboardError;
use crate::registry::ServiceRegistry;

/// One node in a chained service path.
///
/// `registry.accessor().get("pkg").get("Greeter")` accumulates the path
/// `pkg.Greeter`; [`ServiceAccessor::get_instance`] then resolves that full
/// path against the backing registry. Child nodes are materialized on first
/// access and cached for the lifetime of their parent; discarding an accessor
/// never loses state.
pub struct ServiceAccessor<C: Connector> {
    inner: Arc<AccessorInner<C>>,
}

struct AccessorInner<C: Connector> {
    registry: ServiceRegistry<C>,
    path: String,
    children: Mutex<HashMap<String, ServiceAccessor<C>>>,
}

impl<C: Connector> Clone for ServiceAccessor<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connector> fmt::Debug for ServiceAccessor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccessor")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ServiceAccessor<C> {
    /// Root accessor with an empty path.
    pub fn new(registry: ServiceRegistry<C>) -> Self {
        Self::node(registry, String::new())
    }

    /// Root accessor whose path starts at `namespace`.
    pub fn with_root(registry: ServiceRegistry<C>, namespace: impl Into<String>) -> Self {
        Self::node(registry, namespace.into())
    }

    fn node(registry: ServiceRegistry<C>, path: String) -> Self {
        Self {
            inner: Arc::new(AccessorInner {
                registry,
                path,
                children: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The child node one segment deeper, cached per segment.
    pub fn get(&self, segment: &str) -> ServiceAccessor<C> {
        let mut children = self.children();
        if let Some(child) = children.get(segment) {
            return child.clone();
        }
        let path = if self.inner.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.inner.path, segment)
        };
        let child = Self::node(self.inner.registry.clone(), path);
        children.insert(segment.to_string(), child.clone());
        child
    }

    /// Resolve this node's full path as a logical service name and route a
    /// call through the registry, forwarding `params` untouched.
    pub async fn get_instance(
        &self,
        params: Option<&serde_json::Value>,
    ) -> Result<C::Conn, SwitchboardError> {
        self.inner
            .registry
            .get_instance_of(&self.inner.path, params)
            .await
    }

    /// The accumulated dotted path.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    fn children(&self) -> MutexGuard<'_, HashMap<String, ServiceAccessor<C>>> {
        self.inner
            .children
            .lock()
            .expect("accessor children lock poisoned")
    }
}
