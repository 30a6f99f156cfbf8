// ABOUTME: tonic transport binding for switchboard: connector, connection handle, keep-alive config.
// ABOUTME: Implements the switchboard-core Connection/Connector traits over gRPC channels.

pub mod config;
pub mod connection;
pub mod connector;

// Connector configuration
pub use config::{GrpcConnectorConfig, KeepAliveConfig};

// Connection handle
pub use connection::GrpcConnection;

// Connector
pub use connector::GrpcConnector;

// Re-export the core crate so callers need only one direct dependency.
pub use switchboard_core;
