// ABOUTME: Server descriptors held by a pool: address, credential marker, options.
// ABOUTME: Descriptors are immutable; replacing one means remove + add.

use std::time::Duration;

/// Credential marker carried by a descriptor and interpreted by the connector.
///
/// This is data only; certificate material and handshake details live in the
/// transport implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Plaintext connection.
    #[default]
    Insecure,
    /// TLS connection using the transport's root certificates.
    Tls,
}

/// Per-server connection options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerOptions {
    /// Overrides the pool-wide connect timeout for this server.
    pub connect_timeout: Option<Duration>,
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a per-server connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// One server a pool can route to. Identity key is the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    /// Server address (e.g. "localhost:50051" or "http://localhost:50051").
    pub address: String,
    /// Credential marker for the transport.
    pub credentials: Credentials,
    /// Optional per-server overrides.
    pub options: Option<ServerOptions>,
}

impl ServerDescriptor {
    /// Create a plaintext descriptor. The address is whitespace-trimmed.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
            credentials: Credentials::Insecure,
            options: None,
        }
    }

    /// Create a TLS descriptor. The address is whitespace-trimmed.
    pub fn tls(address: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
            credentials: Credentials::Tls,
            options: None,
        }
    }

    /// Attach per-server options.
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The per-server connect timeout override, if any.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.options.and_then(|o| o.connect_timeout)
    }
}
