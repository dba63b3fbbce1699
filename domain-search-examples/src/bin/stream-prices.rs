//! Price Streaming Client
//!
//! Streams `CheckPriceAgent` results for one domain and prints every record
//! as a JSON line. Ctrl-C cancels the stream.
//!
//! Usage:
//!   # Against the local mock server:
//!   cargo run --bin mock-price-server
//!   cargo run --bin stream-prices -- example.com
//!
//!   # Against another deployment:
//!   DOMAIN_SEARCH_URL=https://api.example.com cargo run --bin stream-prices -- example.com
//!
//! Environment:
//!   DOMAIN_SEARCH_URL       base URL (default http://localhost:3000)
//!   DOMAIN_SEARCH_ENDPOINT  method path override
//!   RUST_LOG                log filter, e.g. `domain_search_client=debug`

use std::env;

use anyhow::Context;
use domain_search_client::{CancellationToken, PriceClient, SessionState};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let domain = env::args()
        .nth(1)
        .context("usage: stream-prices <domain>")?;
    let base_url =
        env::var("DOMAIN_SEARCH_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let mut builder = PriceClient::builder(&base_url);
    if let Ok(endpoint) = env::var("DOMAIN_SEARCH_ENDPOINT") {
        builder = builder.endpoint(endpoint);
    }
    let client = builder.build()?;

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling stream");
                token.cancel();
            }
        })
    };

    let mut stream = client
        .search_domain(&domain, token)
        .context("domain must not be empty")?;

    tracing::info!(url = %client.url(), domain = %domain, "streaming prices");

    let mut failed = false;
    while let Some(result) = stream.next().await {
        match result {
            Ok(response) => println!("{}", serde_json::to_string(&response)?),
            Err(e) => {
                eprintln!("error ({}): {}", e.code(), e);
                failed = true;
            }
        }
    }
    ctrl_c.abort();

    match stream.state() {
        SessionState::Cancelled => eprintln!("cancelled after {} records", stream.records()),
        state => tracing::info!(?state, records = stream.records(), "stream finished"),
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
