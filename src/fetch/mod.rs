//! HTTP client for catalog pages and cover art

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

/// Desktop UA string; the catalog site serves a stripped page to
/// unrecognized clients.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Upper bound on any single request, so a stalled fetch cannot hang
/// the whole session.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for fetching catalog pages and cover art
#[derive(Clone)]
pub struct PageClient {
    http_client: Client,
}

impl PageClient {
    /// Create a new page client
    pub fn new() -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http_client })
    }

    /// Fetch a catalog page as text
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        debug!("Fetching page: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch catalog page")?
            .error_for_status()
            .context("Catalog page request rejected")?;

        response
            .text()
            .await
            .context("Failed to read catalog page body")
    }

    /// Fetch a binary resource (cover art) as bytes
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching bytes: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch resource")?
            .error_for_status()
            .context("Resource request rejected")?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read resource body")?;

        Ok(bytes.to_vec())
    }
}
