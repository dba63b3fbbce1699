//! TLS connector setup for the hyper client.
//!
//! TLS support requires both a crypto provider and root certificates:
//!
//! - **Crypto providers** (choose one):
//!   - `tls-ring` - Use ring crypto (default with `tls` feature)
//!   - `tls-aws-lc` - Use AWS LC crypto
//!
//! - **Root certificates** (choose one):
//!   - `tls-native-roots` - Use system root certificates (default with `tls` feature)
//!   - `tls-webpki-roots` - Use bundled Mozilla root certificates
//!
//! Without a crypto provider feature, a globally installed rustls provider
//! is used when there is one.

#[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

use crate::ClientError;

/// Check if TLS features are properly configured.
///
/// Returns true if both a crypto provider AND root certificates are available.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(
            feature = "tls-native-roots",
            feature = "tls-webpki-roots"
        ))
}

/// Try to get a crypto provider ConfigBuilder.
///
/// Priority:
/// 1. Feature-gated provider (tls-ring or tls-aws-lc)
/// 2. User-installed global default provider
fn crypto_provider_builder() -> Option<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    ClientConfig::builder_with_provider(provider?)
        .with_safe_default_protocol_versions()
        .ok()
}

/// Build the root certificate store from enabled features.
fn build_root_store() -> rustls::RootCertStore {
    #[allow(unused_mut)]
    let mut roots = rustls::RootCertStore::empty();

    // Prefer native over webpki if both are enabled
    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            // Some certs may still have loaded
            #[cfg(feature = "tracing")]
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    roots
}

/// Build the default TLS configuration.
///
/// Returns `None` if no crypto provider is available.
pub fn default_tls_config() -> Option<ClientConfig> {
    let builder = crypto_provider_builder()?;
    Some(
        builder
            .with_root_certificates(build_root_store())
            .with_no_client_auth(),
    )
}

/// Build an HTTPS connector that also accepts plain `http://` URLs.
///
/// Without a custom config, falls back to [`default_tls_config`], and fails
/// when no crypto provider is available.
pub fn build_https_connector(
    tls_config: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, ClientError> {
    let config = match tls_config {
        Some(config) => config,
        None => default_tls_config().ok_or_else(|| {
            ClientError::Transport(
                "HTTPS requires a crypto provider: enable `tls-ring` or `tls-aws-lc`, \
                 or install a global rustls CryptoProvider"
                    .into(),
            )
        })?,
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .build())
}
