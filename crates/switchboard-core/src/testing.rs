// ABOUTME: In-crate test doubles: a controllable connector and connection.
// ABOUTME: Compiled only for tests; lets pool and registry tests steer health and failures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::connector::{Connection, Connector};
use crate::error::SwitchboardError;
use crate::health::HealthState;
use crate::name::ServiceName;
use crate::server::ServerDescriptor;

/// Connection double with an externally settable health state.
#[derive(Clone, Debug)]
pub(crate) struct MockConnection {
    pub(crate) id: usize,
    pub(crate) address: String,
    health: Arc<Mutex<HealthState>>,
}

impl MockConnection {
    pub(crate) fn set_health(&self, health: HealthState) {
        *self.health.lock().unwrap() = health;
    }
}

impl Connection for MockConnection {
    fn health(&self) -> HealthState {
        *self.health.lock().unwrap()
    }

    fn close(&self) {
        *self.health.lock().unwrap() = HealthState::Shutdown;
    }
}

#[derive(Default)]
struct MockConnectorInner {
    connects: AtomicUsize,
    next_id: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    failing: Mutex<HashSet<String>>,
}

/// Connector double that counts connects and can delay or fail per address.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    inner: Arc<MockConnectorInner>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Total `connect` calls seen, successful or not.
    pub(crate) fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Make every subsequent connect sleep first.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }

    /// Make connects to this address fail.
    pub(crate) fn fail_address(&self, address: &str) {
        self.inner
            .failing
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub(crate) fn clear_failure(&self, address: &str) {
        self.inner.failing.lock().unwrap().remove(address);
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = MockConnection;

    async fn connect(
        &self,
        _service: &ServiceName,
        server: &ServerDescriptor,
    ) -> Result<MockConnection, SwitchboardError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.failing.lock().unwrap().contains(&server.address) {
            return Err(SwitchboardError::ConnectionFailed {
                address: server.address.clone(),
                message: "mock connect failure".to_string(),
            });
        }
        Ok(MockConnection {
            id: self.inner.next_id.fetch_add(1, Ordering::SeqCst),
            address: server.address.clone(),
            health: Arc::new(Mutex::new(HealthState::Ready)),
        })
    }
}
