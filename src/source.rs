//! Quote sources: anything that turns a ticker into attribute/value pairs.

use crate::error::{GridError, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use reqwest::Client;
use std::time::Duration;

/// Attribute label -> trimmed string value, in the order the source produced them.
pub type Attributes = IndexMap<String, String>;

/// Source of scraped attributes for a ticker.
///
/// Implementations must skip rows they cannot read instead of failing the
/// whole ticker.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch every attribute known for `ticker`. `nocache` asks caching
    /// sources to go back to the origin.
    async fn fetch(&self, ticker: &str, nocache: bool) -> Result<Attributes>;
}

/// Client for the `/endpoint` route exposed by the server.
pub struct EndpointClient {
    client: Client,
    base_url: String,
}

impl EndpointClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(EndpointClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl QuoteSource for EndpointClient {
    async fn fetch(&self, ticker: &str, nocache: bool) -> Result<Attributes> {
        let url = format!("{}/endpoint", self.base_url);
        debug!("GET {} ticker={} nocache={}", url, ticker, nocache);

        let response = self
            .client
            .get(&url)
            .query(&[("ticker", ticker), ("nocache", if nocache { "true" } else { "false" })])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GridError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
