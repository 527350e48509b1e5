//! HTTP link source.
//!
//! One GET per extraction, no retries. Non-2xx responses and transport
//! failures become [`FetchError`]s with a classified reason.

use std::time::Duration;

use log::{debug, warn};

use pt_core::{ExtractionResult, FetchError, LinkSource};

use crate::links::LinkExtractor;

/// Error type for building the HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP settings for page fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("pagetools/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches pages with reqwest and scans them with an extractor.
pub struct HttpLinkSource<E> {
    client: reqwest::Client,
    extractor: E,
}

impl<E: LinkExtractor> HttpLinkSource<E> {
    pub fn new(config: &FetchConfig, extractor: E) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, extractor })
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Fetch a page body, failing on non-2xx statuses.
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown status"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::network(url, e.to_string()))
    }
}

impl<E: LinkExtractor> LinkSource for HttpLinkSource<E> {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, FetchError> {
        let html = match self.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Fetching {} failed: {}", url, e);
                return Err(e);
            }
        };

        let links = self.extractor.extract(&html);
        debug!(
            "Scanned {} bytes from {} with {} extractor: {} links",
            html.len(),
            url,
            self.extractor.name(),
            links.len()
        );

        Ok(ExtractionResult {
            links,
            source_url: url.to_string(),
        })
    }
}
