//! Mock Price Server
//!
//! A minimal gRPC-Web endpoint for `CheckPriceAgent` that streams a few
//! canned prices, one frame at a time, then a trailer frame.
//!
//! Usage:
//!   cargo run --bin mock-price-server            # listens on 127.0.0.1:3000
//!   PORT=8080 cargo run --bin mock-price-server

use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use domain_search_client::message::price_data::{REGISTRATION_PRICE_KEY, RENEWAL_PRICE_KEY};
use domain_search_client::{Money, PriceData, PricePayload, ProductPrice, Promotion};
use domain_search_core::{FrameParser, frame_flags, wrap_envelope};
use futures::StreamExt;
use futures::stream::BoxStream;
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::{BodyExt, Full, StreamBody, combinators::UnsyncBoxBody};
use hyper::body::{Frame, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use prost::Message;
use tokio::net::TcpListener;

/// Registration price per TLD as a decimal string.
const TLDS: [(&str, &str); 4] = [("com", "10.99"), ("net", "12.49"), ("org", "9.75"), ("io", "39.00")];

#[derive(Clone, PartialEq, prost::Message)]
struct WireRequest {
    #[prost(string, tag = "1")]
    product: String,
    #[prost(string, tag = "2")]
    query: String,
    #[prost(string, tag = "3")]
    currency_code: String,
}

#[derive(Clone, PartialEq, prost::Message)]
struct WirePrice {
    #[prost(bool, tag = "1")]
    promotion: bool,
    #[prost(float, tag = "2")]
    cost: f32,
    #[prost(string, tag = "3")]
    currency: String,
    #[prost(string, tag = "4")]
    domain: String,
    #[prost(string, repeated, tag = "5")]
    labels: Vec<String>,
    #[prost(bool, tag = "6")]
    availability: bool,
    #[prost(float, tag = "8")]
    renewal_cost: f32,
}

#[derive(Clone, PartialEq, prost::Message)]
struct WireResponse {
    #[prost(message, optional, tag = "1")]
    price: Option<WirePrice>,
}

type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let port: u16 = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("mock price server listening on http://{}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let result = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service_fn(handle))
                .await;
            if let Err(e) = result {
                tracing::warn!(%peer, "connection error: {}", e);
            }
        });
    }
}

async fn handle(req: Request<Incoming>) -> Result<Response<ResponseBody>, Infallible> {
    if req.method() != Method::POST {
        return Ok(plain(StatusCode::METHOD_NOT_ALLOWED, "POST only"));
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return Ok(plain(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    let mut parser = FrameParser::new();
    parser.push(&body);
    let request = parser
        .next_frame()
        .filter(|frame| !frame.is_trailer())
        .and_then(|frame| WireRequest::decode(frame.payload).ok());

    let frames: Vec<Bytes> = match request {
        Some(request) if !request.query.is_empty() => {
            tracing::info!(query = %request.query, "price request");
            let mut frames: Vec<Bytes> = TLDS
                .iter()
                .filter_map(|(tld, value)| {
                    price_frame(&request.query, tld, value, &request.currency_code)
                })
                .collect();
            frames.push(trailer_frame(0, ""));
            frames
        }
        Some(_) => vec![trailer_frame(3, "query is required")],
        None => vec![trailer_frame(3, "malformed request")],
    };

    let stream: BoxStream<'static, Result<Frame<Bytes>, Infallible>> =
        futures::stream::iter(frames)
            .then(|frame| async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok(Frame::data(frame))
            })
            .boxed();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/grpc-web+proto")
        .body(StreamBody::new(stream).boxed_unsync());
    Ok(response.unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "")))
}

/// Upstream-shaped prices for one TLD: the registration price plus a
/// renewal price two units higher, with a promotion on `.org`.
fn price_data(tld: &str, value: &str, currency: &str) -> PriceData {
    let money = |value: String| Money {
        currency_code: currency.to_string(),
        value,
        ..Money::default()
    };
    let renewal = value.parse::<f64>().map(|v| format!("{:.2}", v + 2.0)).unwrap_or_default();

    let mut data = PriceData::default();
    data.prices.insert(
        REGISTRATION_PRICE_KEY.to_string(),
        ProductPrice {
            price: Some(money(value.to_string())),
            promotion: (tld == "org").then(Promotion::default),
            labels: vec![format!("tld:{}", tld)],
        },
    );
    data.prices.insert(
        RENEWAL_PRICE_KEY.to_string(),
        ProductPrice {
            price: Some(money(renewal)),
            ..ProductPrice::default()
        },
    );
    data
}

fn price_frame(label: &str, tld: &str, value: &str, currency: &str) -> Option<Bytes> {
    let currency = if currency.is_empty() { "USD" } else { currency };
    let domain = format!("{}.{}", label, tld);
    let PricePayload {
        promotion,
        cost,
        currency,
        domain,
        labels,
        availability,
        renewal_cost,
        ..
    } = price_data(tld, value, currency).normalize(&domain)?;

    let msg = WireResponse {
        price: Some(WirePrice {
            promotion,
            cost,
            currency,
            domain,
            labels,
            availability,
            renewal_cost,
        }),
    };
    Some(wrap_envelope(&msg.encode_to_vec(), frame_flags::DATA))
}

fn trailer_frame(status: u32, message: &str) -> Bytes {
    let text = format!("grpc-status: {}\r\ngrpc-message: {}\r\n", status, message);
    wrap_envelope(text.as_bytes(), frame_flags::TRAILER)
}

fn plain(status: StatusCode, text: &str) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(Bytes::from(text.to_string())).boxed_unsync());
    *response.status_mut() = status;
    response
}
