//! HTTP transport layer for the price client.
//!
//! A session talks to the network through the [`Transport`] trait: it hands
//! over one fully built request and gets back the response head plus a
//! stream of body frames. [`HyperTransport`] is the production
//! implementation, built on hyper_util's legacy client:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use domain_search_client::transport::HyperTransportBuilder;
//! use std::time::Duration;
//!
//! let transport = HyperTransportBuilder::new()
//!     .http2_only(true)
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//! ```

mod body;
mod connector;
mod hyper;

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use futures::future::BoxFuture;
use http::{HeaderMap, StatusCode};

use crate::ClientError;

pub use body::FrameStream;
pub use connector::{build_https_connector, default_tls_config, has_tls_support};
pub use self::hyper::{HyperTransport, HyperTransportBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

/// Error text used when a failed response carries no body.
pub const DEFAULT_CONNECT_ERROR: &str = "Failed to connect to the gRPC service.";

/// Response body as a stream of HTTP frames: data chunks, and at most one
/// trailers frame at the end.
pub type BodyStream =
    Pin<Box<dyn Stream<Item = Result<http_body::Frame<Bytes>, ClientError>> + Send>>;

/// Response head and body handed back by a [`Transport`].
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` when the response has no readable body.
    pub body: Option<BodyStream>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.is_some())
            .finish()
    }
}

/// Sends one request and returns the streaming response.
///
/// The returned future owns everything it needs; dropping it (or the body
/// stream) aborts the request and releases the connection.
///
/// A non-success response may be returned either as `Err` or as a
/// [`TransportResponse`] whose body carries the error text; the session reads
/// that body and fails with its text.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'static, Result<TransportResponse, ClientError>>;
}
