//! Price search client.
//!
//! This module provides the main [`PriceClient`] type for opening
//! `CheckPriceAgent` streams.

use std::sync::Arc;

use bytes::Bytes;
use domain_search_core::{EncodeMessage, frame_flags, wrap_envelope};
use http::{Method, Request, header};

use crate::ClientError;
use crate::builder::ClientBuilder;
use crate::cancel::CancellationToken;
use crate::message::SearchPricesRequest;
use crate::session::PriceStream;
use crate::transport::Transport;

/// Path of the price streaming method.
pub const DEFAULT_ENDPOINT: &str = "/domainsearch.v1.DomainSearchService/CheckPriceAgent";

/// Value sent in `x-user-agent` unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "domain-search-ui";

/// Content type for binary gRPC-Web requests and responses.
pub const GRPC_WEB_CONTENT_TYPE: &str = "application/grpc-web+proto";

const X_GRPC_WEB_HEADER: &str = "x-grpc-web";
const X_USER_AGENT_HEADER: &str = "x-user-agent";

/// gRPC-Web client for the domain price service.
///
/// Cheap to clone; clones share the transport and its connection pool.
///
/// Use [`ClientBuilder`] or [`PriceClient::builder`] to create an instance.
///
/// # Example
///
/// ```ignore
/// use domain_search_client::{CancellationToken, PriceClient, SearchPricesRequest};
/// use futures::StreamExt;
///
/// let client = PriceClient::builder("https://api.example.com").build()?;
/// let request = SearchPricesRequest::for_domain("example.com").unwrap();
///
/// let mut stream = client.search_prices(&request, CancellationToken::new());
/// while let Some(record) = stream.next().await {
///     println!("{:?}", record?.price());
/// }
/// ```
#[derive(Clone)]
pub struct PriceClient {
    transport: Arc<dyn Transport>,
    /// Base URL without a trailing slash.
    base_url: String,
    /// Method path, always starting with `/`.
    endpoint: String,
    user_agent: String,
}

impl std::fmt::Debug for PriceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceClient")
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl PriceClient {
    /// Create a new ClientBuilder with the given base URL.
    ///
    /// This is a convenience method equivalent to `ClientBuilder::new(base_url)`.
    pub fn builder<S: Into<String>>(base_url: S) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Called by [`ClientBuilder::build`]. Prefer using the builder API.
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        base_url: String,
        endpoint: String,
        user_agent: String,
    ) -> Self {
        Self {
            transport,
            base_url,
            endpoint,
            user_agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Full URL the request is posted to.
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }

    /// Open a price stream for `request`.
    ///
    /// The returned stream is lazy: nothing is sent until it is first
    /// polled. Firing `token` ends the stream early without an error.
    pub fn search_prices(
        &self,
        request: &SearchPricesRequest,
        token: CancellationToken,
    ) -> PriceStream {
        PriceStream::new(self.transport.clone(), self.build_request(request), token)
    }

    /// Open a price stream for a fully qualified domain name.
    ///
    /// Returns `None` when `domain` is blank.
    pub fn search_domain(&self, domain: &str, token: CancellationToken) -> Option<PriceStream> {
        let request = SearchPricesRequest::for_domain(domain)?;
        Some(self.search_prices(&request, token))
    }

    /// Encode `request` into a single data frame and attach the gRPC-Web
    /// headers.
    fn build_request(&self, request: &SearchPricesRequest) -> Result<Request<Bytes>, ClientError> {
        let body = wrap_envelope(&request.encode_to_vec(), frame_flags::DATA);

        Request::builder()
            .method(Method::POST)
            .uri(self.url())
            .header(header::CONTENT_TYPE, GRPC_WEB_CONTENT_TYPE)
            .header(header::ACCEPT, GRPC_WEB_CONTENT_TYPE)
            .header(X_GRPC_WEB_HEADER, "1")
            .header(X_USER_AGENT_HEADER, self.user_agent.as_str())
            .body(body)
            .map_err(|e| ClientError::Transport(format!("failed to build request: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportResponse;
    use domain_search_core::FrameParser;
    use futures::future::BoxFuture;

    struct NoopTransport;

    impl Transport for NoopTransport {
        fn send(
            &self,
            _request: Request<Bytes>,
        ) -> BoxFuture<'static, Result<TransportResponse, ClientError>> {
            Box::pin(async { Err(ClientError::Transport("unused".into())) })
        }
    }

    fn client() -> PriceClient {
        PriceClient::builder("http://localhost:8080/")
            .transport(NoopTransport)
            .build()
            .unwrap()
    }

    #[test]
    fn test_url_joins_base_and_endpoint() {
        let client = client();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.url(),
            "http://localhost:8080/domainsearch.v1.DomainSearchService/CheckPriceAgent"
        );
    }

    #[test]
    fn test_request_headers() {
        let request = client()
            .build_request(&SearchPricesRequest::for_domain("example.com").unwrap())
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        let headers = request.headers();
        assert_eq!(headers[header::CONTENT_TYPE], GRPC_WEB_CONTENT_TYPE);
        assert_eq!(headers[header::ACCEPT], GRPC_WEB_CONTENT_TYPE);
        assert_eq!(headers[X_GRPC_WEB_HEADER], "1");
        assert_eq!(headers[X_USER_AGENT_HEADER], DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_body_is_one_data_frame() {
        let search = SearchPricesRequest::for_domain("example.com").unwrap();
        let request = client().build_request(&search).unwrap();

        let mut parser = FrameParser::new();
        parser.push(request.body());
        let frame = parser.next_frame().unwrap();
        assert!(!frame.is_trailer());
        assert_eq!(frame.payload.as_ref(), search.encode_to_vec().as_slice());
        assert!(parser.is_empty());
    }

    #[test]
    fn test_search_domain_rejects_blank() {
        let client = client();
        assert!(client.search_domain("   ", CancellationToken::new()).is_none());
        assert!(client.search_domain("example.com", CancellationToken::new()).is_some());
    }
}
