//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperTransport`], the production [`Transport`]
//! implementation using hyper_util's legacy client.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;

use super::body::FrameStream;
use super::connector::build_https_connector;
use super::{DEFAULT_CONNECT_ERROR, Transport, TransportResponse};
use crate::ClientError;

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP transport using hyper_util's legacy client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    /// Whether HTTP/2 only mode is enabled.
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, ClientError> {
        Self::builder().build()
    }

    /// Check if this transport is configured for HTTP/2 only.
    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }
}

impl Transport for HyperTransport {
    fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'static, Result<TransportResponse, ClientError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let request = request.map(Full::new);
            let response = client
                .request(request)
                .await
                .map_err(|e| ClientError::Transport(format!("request failed: {}", e)))?;

            let (parts, body) = response.into_parts();

            if !parts.status.is_success() {
                // The error body is best effort; an unreadable one counts as empty.
                let text = match body.collect().await {
                    Ok(collected) => {
                        String::from_utf8_lossy(&collected.to_bytes()).trim().to_string()
                    }
                    Err(_) => String::new(),
                };
                let message = if text.is_empty() {
                    DEFAULT_CONNECT_ERROR.to_string()
                } else {
                    text
                };
                return Err(ClientError::Transport(message));
            }

            Ok(TransportResponse {
                status: parts.status,
                headers: parts.headers,
                body: Some(Box::pin(FrameStream::new(body))),
            })
        })
    }
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use domain_search_client::transport::HyperTransportBuilder;
/// use std::time::Duration;
///
/// let transport = HyperTransportBuilder::new()
///     .http2_only(true)
///     .pool_idle_timeout(Duration::from_secs(90))
///     .build()?;
/// ```
pub struct HyperTransportBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Force HTTP/2 only (for h2c or when HTTP/2 is required).
    http2_only: bool,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
    /// HTTP/2 keep-alive interval.
    h2_keep_alive_interval: Option<Duration>,
    /// HTTP/2 keep-alive timeout.
    h2_keep_alive_timeout: Option<Duration>,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    /// Create a new transport builder with default settings.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
            h2_keep_alive_interval: None,
            h2_keep_alive_timeout: None,
        }
    }

    /// Set a custom TLS configuration (private roots, client certificates).
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Enable HTTP/2 only mode.
    ///
    /// Skips the HTTP/1.1 upgrade handshake; needed for h2c. Over HTTPS,
    /// HTTP/2 is negotiated via ALPN anyway.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Send HTTP/2 PING frames at this interval.
    pub fn h2_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.h2_keep_alive_interval = Some(interval);
        self
    }

    /// How long to wait for a PING response.
    ///
    /// Only effective if `h2_keep_alive_interval` is also set.
    pub fn h2_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.h2_keep_alive_timeout = Some(timeout);
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HyperTransport, ClientError> {
        let https_connector = build_https_connector(self.tls_config)?;

        let mut builder = Client::builder(TokioExecutor::new());

        // Required for pool_idle_timeout to work
        builder.pool_timer(TokioTimer::new());

        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);

        if self.http2_only {
            builder.http2_only(true);
        }

        if let Some(interval) = self.h2_keep_alive_interval {
            builder.http2_keep_alive_interval(interval);
        }

        if let Some(timeout) = self.h2_keep_alive_timeout {
            builder.http2_keep_alive_timeout(timeout);
        }

        let client = builder.build(https_connector);

        Ok(HyperTransport {
            client,
            http2_only: self.http2_only,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("h2_keep_alive_interval", &self.h2_keep_alive_interval)
            .field("h2_keep_alive_timeout", &self.h2_keep_alive_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperTransportBuilder::new();
        assert!(!builder.http2_only);
        assert_eq!(builder.pool_max_idle_per_host, 32);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_builder_settings() {
        let builder = HyperTransportBuilder::new()
            .http2_only(true)
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10)
            .h2_keep_alive_interval(Duration::from_secs(10))
            .h2_keep_alive_timeout(Duration::from_secs(5));

        assert!(builder.http2_only);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(60)));
        assert_eq!(builder.pool_max_idle_per_host, 10);
        assert_eq!(builder.h2_keep_alive_interval, Some(Duration::from_secs(10)));
        assert_eq!(builder.h2_keep_alive_timeout, Some(Duration::from_secs(5)));
    }

    #[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
    #[test]
    fn test_build_transport_http2_only() {
        let transport = HyperTransportBuilder::new()
            .http2_only(true)
            .build()
            .unwrap();
        assert!(transport.is_http2_only());
    }
}
