//! Shared HTTP client for the network-backed tiers.
//!
//! - HTTP/2 with adaptive windows, connection pooling, keep-alive
//! - Brotli/Gzip negotiated automatically
//! - Cookie store (watch pages set consent cookies)
//! - Bounded timeouts so a stalled tier cannot hold up a cycle

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::AcquisitionConfig;

/// HTTP client used by the API and page tiers.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &AcquisitionConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let client = Client::builder()
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// GET with query parameters; non-2xx statuses are errors.
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        debug!("GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{url} returned HTTP {status}");
        }
        Ok(response)
    }

    /// GET and return the body as text.
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        self.get(url, query)
            .await?
            .text()
            .await
            .context("Failed to read response body")
    }

    /// GET and deserialize a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        self.get(url, query)
            .await?
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse JSON from {url}"))
    }
}
