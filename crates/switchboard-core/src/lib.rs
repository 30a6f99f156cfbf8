// ABOUTME: Transport-agnostic service routing: pools, strategies, registry, chained accessors.
// ABOUTME: Transports implement the Connection/Connector traits; see switchboard-grpc.

pub mod accessor;
pub mod connector;
pub mod error;
pub mod health;
pub mod name;
pub mod pool;
pub mod registry;
pub mod routing;
pub mod server;

#[cfg(test)]
mod testing;

// Connection capability traits
pub use connector::{Connection, Connector};

// Error types
pub use error::SwitchboardError;

// Health states
pub use health::HealthState;

// Service naming
pub use name::ServiceName;

// Pooling
pub use pool::{PoolConfig, ServicePool, DEFAULT_CONNECT_TIMEOUT};

// Routing strategies
pub use routing::{RoundRobin, RouteContext, RoutingStrategy, ServerHealth};

// Registry and chained access
pub use accessor::ServiceAccessor;
pub use registry::ServiceRegistry;

// Server descriptors
pub use server::{Credentials, ServerDescriptor, ServerOptions};
