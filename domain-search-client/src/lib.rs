//! gRPC-Web client for the domain search price service.
//!
//! This crate opens `domainsearch.v1.DomainSearchService/CheckPriceAgent`
//! server-streaming calls over gRPC-Web and exposes each one as a
//! [`PriceStream`]: a `futures::Stream` of decoded price records.
//!
//! ## Features
//!
//! - Lazy, pull-based streams: records are decoded as they are polled
//! - Cooperative cancellation through [`CancellationToken`]
//! - Trailer-frame and header-based terminal status handling
//! - HTTP/1.1 and HTTP/2 over rustls (`tls*` features)
//! - Optional `tracing` spans and events (`tracing` feature, on by default)
//!
//! ## Example
//!
//! ```ignore
//! use domain_search_client::{CancellationToken, PriceClient};
//! use futures::StreamExt;
//!
//! let client = PriceClient::builder("https://api.example.com").build()?;
//! let token = CancellationToken::new();
//!
//! let mut stream = client
//!     .search_domain("example.com", token.clone())
//!     .expect("non-empty domain");
//!
//! while let Some(record) = stream.next().await {
//!     match record {
//!         Ok(response) => println!("{:?}", response.price()),
//!         Err(e) => eprintln!("error: {}", e),
//!     }
//! }
//!
//! println!("finished in state {:?}", stream.state());
//! ```

pub mod builder;
pub mod cancel;
pub mod client;
pub mod error;
pub mod message;
pub mod session;
pub mod transport;

pub use builder::{ClientBuilder, ClientBuildError};
pub use cancel::CancellationToken;
pub use client::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, GRPC_WEB_CONTENT_TYPE, PriceClient};
pub use error::ClientError;
pub use message::{
    DomainPriceFilter, Money, PriceData, PriceFilter, PricePayload, PriceResponse, ProductPrice,
    Promotion, PromotionPeriod, SearchPricesRequest, SearchPricesResponse, Status, TldFilter,
};
pub use session::{PriceStream, SessionState};
pub use transport::{HyperTransport, HyperTransportBuilder, Transport, TransportResponse};

// Re-export core types
pub use domain_search_core::{
    Code, DecodeError, Frame, FrameKind, FrameParser, Trailers, frame_flags, wrap_envelope,
};
