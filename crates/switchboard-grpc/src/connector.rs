// ABOUTME: tonic-backed Connector that builds endpoints with TLS and keep-alive settings.
// ABOUTME: The pool enforces connect deadlines; this connector fails fast on transport errors.

use async_trait::async_trait;
use switchboard_core::{
    Connector, Credentials, ServerDescriptor, ServiceName, SwitchboardError,
};
use tonic::transport::{ClientTlsConfig, Endpoint};

use crate::config::GrpcConnectorConfig;
use crate::connection::GrpcConnection;

/// Dials gRPC channels for a [`ServicePool`](switchboard_core::ServicePool).
///
/// The scheme is derived from the descriptor's credentials: `https://` for
/// TLS, `http://` otherwise. Addresses that already carry a scheme are
/// rewritten to match.
#[derive(Debug, Clone, Default)]
pub struct GrpcConnector {
    config: GrpcConnectorConfig,
}

impl GrpcConnector {
    /// Connector with default keep-alive settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector with explicit configuration.
    pub fn with_config(config: GrpcConnectorConfig) -> Self {
        Self { config }
    }
}

fn endpoint_uri(address: &str, credentials: Credentials) -> String {
    let address = address.trim();
    let scheme = match credentials {
        Credentials::Tls => "https",
        Credentials::Insecure => "http",
    };
    let lower = address.to_lowercase();
    if lower.starts_with("http://") {
        format!("{}://{}", scheme, &address[7..])
    } else if lower.starts_with("https://") {
        format!("{}://{}", scheme, &address[8..])
    } else {
        format!("{}://{}", scheme, address)
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    type Conn = GrpcConnection;

    async fn connect(
        &self,
        service: &ServiceName,
        server: &ServerDescriptor,
    ) -> Result<Self::Conn, SwitchboardError> {
        let uri = endpoint_uri(&server.address, server.credentials);

        let mut endpoint =
            Endpoint::from_shared(uri.clone()).map_err(|e| SwitchboardError::InvalidAddress {
                address: server.address.clone(),
                message: e.to_string(),
            })?;

        if server.credentials == Credentials::Tls {
            endpoint = endpoint.tls_config(ClientTlsConfig::new()).map_err(|e| {
                SwitchboardError::ConnectionFailed {
                    address: server.address.clone(),
                    message: format!("TLS config error: {}", e),
                }
            })?;
        }

        if let Some(keep_alive) = &self.config.keep_alive {
            endpoint = endpoint
                .http2_keep_alive_interval(keep_alive.interval)
                .keep_alive_timeout(keep_alive.timeout)
                .keep_alive_while_idle(keep_alive.while_idle);
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| SwitchboardError::ConnectionFailed {
                address: server.address.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            service = %service,
            address = %uri,
            tls = server.credentials == Credentials::Tls,
            keep_alive = self.config.keep_alive.is_some(),
            "gRPC channel connected"
        );

        Ok(GrpcConnection::new(channel, server.address.clone()))
    }
}
