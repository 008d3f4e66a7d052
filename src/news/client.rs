//! HTTP client creation and request header profiles for the search endpoint.

use anyhow::Result;
use reqwest::{cookie::Jar, header, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::TARGET_WEB_REQUEST;

/// How the underlying connection is managed for a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Shared client with connection pooling and a cookie store.
    Pooled,
    /// A new HTTP/1.1-only client per attempt, nothing reused.
    Fresh,
}

/// Create a client for the given transport.
pub fn create_http_client(transport: Transport) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder()
        .gzip(true)
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::default());

    let builder = match transport {
        Transport::Pooled => {
            debug!(target: TARGET_WEB_REQUEST, "Creating pooled HTTP client");
            builder
                .cookie_store(true)
                .cookie_provider(Arc::new(Jar::default()))
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Some(Duration::from_secs(30)))
        }
        Transport::Fresh => {
            debug!(target: TARGET_WEB_REQUEST, "Creating unpooled HTTP/1.1 client");
            builder.http1_only().pool_max_idle_per_host(0)
        }
    };

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

/// Header sets the search endpoint has been observed to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Full desktop browser request, as issued from the endpoint's docs page.
    Browser,
    /// Minimal bot user agent.
    Simple,
    /// Command-line client, caching disabled.
    Curl,
    /// API tool user agent.
    Postman,
}

impl HeaderProfile {
    pub fn user_agent(&self) -> &'static str {
        match self {
            HeaderProfile::Browser => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            HeaderProfile::Simple => "Mozilla/5.0 (compatible; NewsBot/1.0)",
            HeaderProfile::Curl => "curl/7.68.0",
            HeaderProfile::Postman => "PostmanRuntime/7.32.3",
        }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::USER_AGENT, self.user_agent());
        match self {
            HeaderProfile::Browser => request
                .header(header::ACCEPT, "application/json, text/plain, */*")
                .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .header(header::CACHE_CONTROL, "no-cache")
                .header("DNT", "1")
                .header(header::ORIGIN, "https://gnews.io")
                .header(header::REFERER, "https://gnews.io/docs/v4")
                .header("Sec-Fetch-Dest", "empty")
                .header("Sec-Fetch-Mode", "cors")
                .header("Sec-Fetch-Site", "same-origin"),
            HeaderProfile::Simple => request.header(header::ACCEPT, "application/json"),
            HeaderProfile::Curl => request
                .header(header::ACCEPT, "*/*")
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache"),
            HeaderProfile::Postman => request.header(header::ACCEPT, "*/*"),
        }
    }
}
