use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};

/// HTTP client that identifies itself like a browser coming from the
/// catalogue's front page. Every request carries an explicit timeout and is
/// tried exactly once.
#[derive(Clone)]
pub struct CatalogueClient {
    client: reqwest::Client,
}

impl CatalogueClient {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(&config.referer)
            .map_err(|e| ScrapeError::Parse(format!("invalid referer header: {e}")))?;
        headers.insert(REFERER, referer);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response> {
        debug!(url, ?timeout, "GET");
        let resp = self.client.get(url).timeout(timeout).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let resp = self.get(url, timeout).await?;
        Ok(resp.text().await?)
    }

    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let resp = self.get(url, timeout).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}
