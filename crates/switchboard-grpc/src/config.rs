// ABOUTME: Configuration for the gRPC connector: HTTP/2 keep-alive behavior.
// ABOUTME: Keep-alive defaults suit long-lived channels sitting behind load balancers.

use std::time::Duration;

/// HTTP/2 keep-alive settings applied to every channel the connector opens.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between keep-alive pings while the connection is idle.
    pub interval: Duration,
    /// How long to wait for a ping response before declaring the peer dead.
    pub timeout: Duration,
    /// Send pings even when no streams are active.
    pub while_idle: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(20),
            while_idle: true,
        }
    }
}

/// Configuration for [`GrpcConnector`](crate::GrpcConnector).
#[derive(Debug, Clone)]
pub struct GrpcConnectorConfig {
    /// Keep-alive configuration. `None` disables keep-alive pings.
    pub keep_alive: Option<KeepAliveConfig>,
}

impl Default for GrpcConnectorConfig {
    fn default() -> Self {
        Self {
            keep_alive: Some(KeepAliveConfig::default()),
        }
    }
}

impl GrpcConnectorConfig {
    /// Config with default keep-alive settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable keep-alive pings.
    pub fn without_keep_alive(mut self) -> Self {
        self.keep_alive = None;
        self
    }

    /// Set custom keep-alive settings.
    pub fn with_keep_alive(mut self, config: KeepAliveConfig) -> Self {
        self.keep_alive = Some(config);
        self
    }
}
