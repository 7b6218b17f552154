//! Shared HTTP transport for the HTTP/JSON/PDF extractor families. One
//! connection-pooled client, browser-shaped headers, rotating desktop
//! User-Agent per request.

use std::time::Duration;

use reqwest::header;
use serde::de::DeserializeOwned;
use tracing::debug;

use laisuat_core::ScrapeError;

pub mod user_agent;

use user_agent::UserAgentRotation;

const ACCEPT_LANGUAGE: &str = "vi-VN,vi;q=0.9,en-US;q=0.8,en;q=0.7";

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

pub struct HttpFetcher {
    client: reqwest::Client,
    user_agents: UserAgentRotation,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()
            .map_err(|e| ScrapeError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            user_agents: UserAgentRotation::new(),
        })
    }

    /// Fetch a page body as text. Non-200 responses and transport failures
    /// surface as the orchestrator's retryable error classes.
    pub async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.send(url, ACCEPT_HTML).await?;
        response
            .text()
            .await
            .map_err(|e| ScrapeError::ParsingFailed(format!("body decode for {url}: {e}")))
    }

    /// Fetch and deserialize a JSON endpoint.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ScrapeError> {
        let response = self.send(url, "application/json, text/plain, */*").await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ScrapeError::ParsingFailed(format!("json decode for {url}: {e}")))
    }

    /// Fetch a binary body (rate-sheet PDFs).
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        let response = self.send(url, "*/*").await?;
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, url: &str, accept: &str) -> Result<reqwest::Response, ScrapeError> {
        let user_agent = self.user_agents.next();
        debug!(url, user_agent, "GET");

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .header(header::ACCEPT, accept)
            .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapeError::RateLimited(url.to_string()));
        }
        if !status.is_success() {
            return Err(ScrapeError::BankUnavailable {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn map_transport_error(e: reqwest::Error) -> ScrapeError {
    // DNS, connect, TLS and deadline failures all land here; the retry layer
    // treats them uniformly as transient.
    ScrapeError::NetworkTimeout(e.to_string())
}
