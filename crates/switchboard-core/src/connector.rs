// ABOUTME: Capability traits the pool consumes: a connection handle and its factory.
// ABOUTME: Transports (and test mocks) implement these; the core never dials sockets itself.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::health::HealthState;
use crate::name::ServiceName;
use crate::server::ServerDescriptor;

/// A live connection to one server address.
///
/// Handles are cheap to clone; all clones observe the same underlying
/// connection and health state.
pub trait Connection: Clone + Send + Sync + 'static {
    /// Current health of this connection.
    fn health(&self) -> HealthState;

    /// Close the connection. After this, `health()` reports `Shutdown`.
    fn close(&self);
}

/// Factory that materializes connections for a pool.
///
/// `service` is the logical name the pool was built for, passed through for
/// logging and transport-side bookkeeping. Implementations should fail fast;
/// the pool enforces the connect deadline around this call.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    async fn connect(
        &self,
        service: &ServiceName,
        server: &ServerDescriptor,
    ) -> Result<Self::Conn, SwitchboardError>;
}
