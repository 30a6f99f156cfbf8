// ABOUTME: Error types for the switchboard-core crate.
// ABOUTME: Provides structured errors for routing, naming, registry, and connect operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while routing, registering, or connecting to services.
#[derive(Error, Debug)]
pub enum SwitchboardError {
    /// Routing produced no usable server address.
    #[error("no available server for service '{service}'")]
    NoAvailableServer { service: String },

    /// A routing strategy returned an address with no matching server.
    #[error("invalid route for service '{service}': unknown address '{address}'")]
    InvalidRoute { service: String, address: String },

    /// A new connection did not become ready within the deadline.
    #[error("connect to '{address}' timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    /// A connection attempt failed before the deadline.
    #[error("connection to '{address}' failed: {message}")]
    ConnectionFailed { address: String, message: String },

    /// Invalid server address format.
    #[error("invalid server address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    /// Lookup for a logical service name that was never registered.
    #[error("service '{name}' is not registered")]
    ServiceNotRegistered { name: String },

    /// Malformed logical service name.
    #[error("invalid service name '{name}': {reason}")]
    InvalidServiceName { name: String, reason: String },
}
