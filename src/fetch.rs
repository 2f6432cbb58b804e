//! Page fetching seam.
//!
//! The crawler only ever talks to the [`Fetcher`] trait: given a URL it gets
//! back raw page content or a failure. The bundled [`HttpFetcher`] is a thin
//! reqwest implementation; tests substitute their own.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CrawlConfig;
use crate::error::IngestError;

/// Raw content for one fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after any redirects.
    pub url: String,
    pub html: String,
}

/// External page-fetching collaborator. Any failure is reported as
/// [`IngestError::Fetch`] and treated by the crawler as skip-and-log,
/// never fatal to the run.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, IngestError>;
}

/// HTTP fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, IngestError> {
        let fetch_err = |reason: String| IngestError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {}", status)));
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        Ok(FetchedPage {
            url: final_url,
            html,
        })
    }
}
