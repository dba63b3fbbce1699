//! Typed messages of the `CheckPriceAgent` RPC.
//!
//! - [`request`]: the outbound request and its filters
//! - [`response`]: the streamed response records
//! - [`price_data`]: upstream price-service shapes and their normalization

pub mod price_data;
pub mod request;
pub mod response;

pub use price_data::{Money, PriceData, ProductPrice, Promotion, PromotionPeriod};
pub use request::{DomainPriceFilter, PriceFilter, SearchPricesRequest, TldFilter};
pub use response::{PricePayload, PriceResponse, SearchPricesResponse, Status};
