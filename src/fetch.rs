// src/fetch.rs
//! # Proxy Fetcher
//!
//! Retrieves raw feed bytes for one source URL behind an ordered list of
//! transport routes: a direct route first, then indirection routes used to
//! get past cross-origin restrictions on hosted deployments. Routes are
//! tried sequentially with a per-attempt timeout; the first success wins.
//! Exhausting every route is a local failure for that source only.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;

/// Low-level GET abstraction so tests can substitute canned transports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the body at `url`. Non-2xx statuses are errors.
    async fn get(&self, url: &str) -> Result<String>;
}

/// Production transport backed by a shared reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("intel-feed-engine/0.1 (+feed ingestion)")
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(
                "Accept",
                "application/rss+xml, application/atom+xml, application/xml, text/xml, */*",
            )
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {status} for {url}"));
        }
        resp.text().await.context("reading response body")
    }
}

/// One hop in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Hit the upstream URL as-is.
    Direct,
    /// Indirection service that echoes the upstream body verbatim;
    /// the upstream URL goes percent-encoded into a query parameter.
    Prefixed { prefix: String },
    /// Indirection service that wraps the body in a JSON envelope
    /// (`{"contents": "..."}`). A missing or ill-typed `contents` field is
    /// treated like any other route error.
    Envelope { prefix: String },
}

impl Route {
    fn request_url(&self, upstream: &str) -> String {
        match self {
            Route::Direct => upstream.to_string(),
            Route::Prefixed { prefix } | Route::Envelope { prefix } => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(upstream.as_bytes()).collect();
                format!("{prefix}{encoded}")
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Route::Direct => "direct",
            Route::Prefixed { .. } => "prefixed",
            Route::Envelope { .. } => "envelope",
        }
    }
}

/// Default chain: direct, then two public indirection services.
pub fn default_routes() -> Vec<Route> {
    vec![
        Route::Direct,
        Route::Envelope {
            prefix: "https://api.allorigins.win/get?url=".to_string(),
        },
        Route::Prefixed {
            prefix: "https://api.codetabs.com/v1/proxy?quest=".to_string(),
        },
    ]
}

/// Raised when every route has been tried and failed for one source.
#[derive(Debug, thiserror::Error)]
#[error("all {attempts} routes exhausted for {url}")]
pub struct ExhaustedError {
    pub url: String,
    pub attempts: usize,
}

/// Stateless per-source fetcher. Shared across all sources of a pass.
pub struct ProxyFetcher {
    transport: std::sync::Arc<dyn Transport>,
    routes: Vec<Route>,
    timeout: Duration,
}

impl ProxyFetcher {
    pub fn new(
        transport: std::sync::Arc<dyn Transport>,
        routes: Vec<Route>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            routes,
            timeout,
        }
    }

    /// Try each route in order; return the first successful body.
    /// Every failure path (connect error, timeout, bad status, malformed
    /// envelope) falls through to the next route.
    pub async fn fetch(&self, upstream: &str) -> Result<String, ExhaustedError> {
        for route in &self.routes {
            let request_url = route.request_url(upstream);
            let attempt = tokio::time::timeout(self.timeout, self.transport.get(&request_url));
            let body = match attempt.await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    tracing::warn!(route = route.label(), url = upstream, error = ?e, "route failed");
                    counter!("fetch_route_errors_total").increment(1);
                    continue;
                }
                Err(_) => {
                    tracing::warn!(route = route.label(), url = upstream, "route timed out");
                    counter!("fetch_route_errors_total").increment(1);
                    continue;
                }
            };

            match unwrap_route_body(route, body) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!(route = route.label(), url = upstream, error = ?e, "bad envelope");
                    counter!("fetch_route_errors_total").increment(1);
                }
            }
        }

        counter!("fetch_exhausted_total").increment(1);
        Err(ExhaustedError {
            url: upstream.to_string(),
            attempts: self.routes.len(),
        })
    }
}

fn unwrap_route_body(route: &Route, body: String) -> Result<String> {
    match route {
        Route::Direct | Route::Prefixed { .. } => Ok(body),
        Route::Envelope { .. } => {
            let v: serde_json::Value =
                serde_json::from_str(&body).context("envelope is not JSON")?;
            v.get("contents")
                .and_then(|c| c.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| anyhow!("envelope has no string `contents` field"))
        }
    }
}
