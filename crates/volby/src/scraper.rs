use std::time::Duration;

use reqwest::{Client, Url};

use crate::parser::{ParseError, parse_municipality_links, parse_municipality_page};
use crate::types::{MunicipalityRef, MunicipalityResult};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client })
    }

    /// Fetches a territorial-unit index page and extracts the list of
    /// municipality detail links, resolved against the index URL.
    pub async fn fetch_index(&self, url: &str) -> Result<Vec<MunicipalityRef>, ScraperError> {
        let base = Url::parse(url).map_err(|e| ScraperError::InvalidUrl(format!("{url}: {e}")))?;
        let html = self.get_text(url).await?;
        let refs = parse_municipality_links(&html, &base)?;
        Ok(refs)
    }

    /// Fetches one municipality detail page and parses its turnout
    /// summary and party tally.
    pub async fn fetch_municipality(&self, url: &str) -> Result<MunicipalityResult, ScraperError> {
        let html = self.get_text(url).await?;
        let (summary, parties) = parse_municipality_page(&html)?;
        Ok(MunicipalityResult { summary, parties })
    }

    async fn get_text(&self, url: &str) -> Result<String, ScraperError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}
