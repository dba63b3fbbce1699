//! Client builder for the price client.
//!
//! Provides a fluent API for configuring and building a [`PriceClient`].

use std::sync::Arc;

use crate::ClientError;
use crate::client::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, PriceClient};
use crate::transport::{HyperTransportBuilder, Transport};

/// Errors that can occur when building a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The base URL is not an absolute `http` or `https` URL.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The default transport could not be built.
    #[error("failed to build transport: {0}")]
    Transport(#[source] ClientError),
}

/// Builder for creating a [`PriceClient`].
///
/// # Example
///
/// ```ignore
/// use domain_search_client::ClientBuilder;
///
/// let client = ClientBuilder::new("http://localhost:8080")
///     .user_agent("price-cli")
///     .http2_only(true)
///     .build()?;
/// ```
pub struct ClientBuilder {
    /// Base URL for the service (e.g., "http://localhost:8080").
    base_url: String,
    /// Method path appended to the base URL.
    endpoint: String,
    /// Value of the `x-user-agent` header.
    user_agent: String,
    /// Custom transport; replaces the default hyper transport.
    transport: Option<Arc<dyn Transport>>,
    /// Force HTTP/2 on the default transport.
    http2_only: bool,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("transport", &self.transport.is_some())
            .field("http2_only", &self.http2_only)
            .finish()
    }
}

impl ClientBuilder {
    /// Create a new ClientBuilder with the given base URL.
    ///
    /// The base URL should include the scheme and host, e.g.,
    /// "http://localhost:8080". A trailing slash is dropped.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            transport: None,
            http2_only: false,
        }
    }

    /// Override the method path.
    ///
    /// A missing leading `/` is added.
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the `x-user-agent` header value.
    ///
    /// Default: `domain-search-ui`.
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a custom transport instead of the default hyper client.
    ///
    /// `http2_only` has no effect on a custom transport.
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Force HTTP/2 on the default transport (needed for h2c servers).
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute `http`/`https`
    /// URL, or if the default transport cannot be created.
    pub fn build(self) -> Result<PriceClient, ClientBuildError> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        validate_base_url(&base_url)?;

        let endpoint = if self.endpoint.starts_with('/') {
            self.endpoint
        } else {
            format!("/{}", self.endpoint)
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HyperTransportBuilder::new()
                    .http2_only(self.http2_only)
                    .build()
                    .map_err(ClientBuildError::Transport)?,
            ),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(base_url = %base_url, endpoint = %endpoint, "price client built");

        Ok(PriceClient::new(
            transport,
            base_url,
            endpoint,
            self.user_agent,
        ))
    }
}

fn validate_base_url(url: &str) -> Result<(), ClientBuildError> {
    let invalid = |reason: &str| ClientBuildError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(_) => return Err(invalid("scheme must be http or https")),
        None => return Err(invalid("missing scheme")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(())
}
