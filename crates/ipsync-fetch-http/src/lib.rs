// # HTTP Address Source
//
// This crate provides the HTTP-based address source for the ipsync
// daemon.
//
// ## Purpose
//
// Asks an external lookup service (default: api.ipify.org) for the
// host's public address. The service answers a JSON body of the shape
// `{ "ip": "<string>" }` on status 200.
//
// ## Contract
//
// One request per `fetch()`, bounded by a client-level timeout. No
// retries here: retry and backoff policy belong to the Reconciler.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use ipsync_core::traits::AddressSource;
use ipsync_core::{Error, Result};

/// Default lookup endpoint
pub const DEFAULT_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response body of the lookup service
#[derive(Debug, Deserialize)]
struct LookupResponse {
    ip: String,
}

/// Parse and validate a lookup response body
///
/// Kept separate from the request so the body handling is testable
/// without a live service.
fn parse_body(body: &str) -> Result<String> {
    let response: LookupResponse =
        serde_json::from_str(body).map_err(|e| Error::parse(format!("invalid body: {e}")))?;

    let address = response.ip.trim().to_string();
    if address.is_empty() {
        return Err(Error::EmptyAddress);
    }
    Ok(address)
}

/// HTTP-based address source
///
/// # Example
///
/// ```rust,no_run
/// use ipsync_fetch_http::HttpAddressSource;
/// use ipsync_core::traits::AddressSource;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let source = HttpAddressSource::default_endpoint()?;
///     let address = source.fetch().await?;
///     println!("public address: {address}");
///     Ok(())
/// }
/// ```
pub struct HttpAddressSource {
    /// URL of the lookup service
    url: String,

    /// HTTP client with the request timeout applied
    client: reqwest::Client,
}

impl HttpAddressSource {
    /// Create a source for the given lookup URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a source for the default public endpoint
    pub fn default_endpoint() -> Result<Self> {
        Self::new(DEFAULT_LOOKUP_URL)
    }

    /// Create a source with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// The lookup URL this source queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AddressSource for HttpAddressSource {
    async fn fetch(&self) -> Result<String> {
        debug!("fetching current address from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::protocol(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("failed to read response body: {e}")))?;

        let address = parse_body(&body)?;
        debug!("successfully fetched current address: {}", address);
        Ok(address)
    }
}
