//! News harvesting for the econews agent.
//!
//! The harvester fetches one listing page, follows every article link on
//! it in order, and turns each article page into an [`ArticleRecord`].
//! Fetches are sequential; the first failure aborts the harvest.

pub mod config;
pub mod error;
pub mod extract;
pub mod types;

pub use config::HarvestConfig;
pub use error::ScrapingError;
pub use extract::PageSelectors;
pub use types::ArticleRecord;

use tracing::{debug, info};
use url::Url;

/// Crawls the configured listing page.
#[derive(Clone, Debug)]
pub struct NewsHarvester {
    config: HarvestConfig,
    selectors: PageSelectors,
    client: reqwest::Client,
}

impl NewsHarvester {
    /// Create a new harvester with the given configuration.
    ///
    /// # Errors
    /// Returns an error if a selector is invalid or the HTTP client cannot
    /// be created.
    pub fn new(config: HarvestConfig) -> Result<Self, ScrapingError> {
        let selectors = PageSelectors::from_config(&config)?;
        let client = Self::build_client(&config)?;

        Ok(Self {
            config,
            selectors,
            client,
        })
    }

    /// Create a new harvester with default configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, ScrapingError> {
        Self::new(HarvestConfig::default())
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Build an HTTP client with browser-like headers.
    fn build_client(config: &HarvestConfig) -> Result<reqwest::Client, ScrapingError> {
        use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

        let mut headers = HeaderMap::new();

        let ua = config.random_user_agent();
        if let Ok(ua_value) = HeaderValue::from_str(&ua) {
            headers.insert(USER_AGENT, ua_value);
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.5"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| ScrapingError::HttpClient(e.to_string()))
    }

    /// Harvest the configured listing page.
    ///
    /// # Errors
    /// Returns the first fetch or URL error; no partial result is kept.
    pub async fn harvest(&self) -> Result<Vec<ArticleRecord>, ScrapingError> {
        let listing = self.config.listing_url.clone();
        self.harvest_from(&listing).await
    }

    /// Harvest an explicit listing page.
    ///
    /// # Errors
    /// Returns the first fetch or URL error; no partial result is kept.
    pub async fn harvest_from(&self, listing_url: &str) -> Result<Vec<ArticleRecord>, ScrapingError> {
        let listing_url = Url::parse(listing_url)?;
        let root = Url::parse(&self.config.article_root)?;

        info!(url = %listing_url, "Fetching news listing");
        let html = self.fetch_html(&listing_url).await?;
        let links = extract::extract_links(&html, &self.selectors, &root)?;
        info!(count = links.len(), "Found article links");

        let mut records = Vec::with_capacity(links.len());
        for link in links {
            debug!(url = %link, "Fetching article");
            let page = self.fetch_html(&link).await?;
            records.push(extract::extract_article(&page, &self.selectors));
        }

        let empty = records.iter().filter(|r| r.is_placeholder()).count();
        info!(articles = records.len(), empty, "Harvest finished");
        Ok(records)
    }

    /// Fetch a page body, rejecting non-success statuses.
    ///
    /// # Errors
    /// Returns an error on network failure or a non-success status.
    pub async fn fetch_html(&self, url: &Url) -> Result<String, ScrapingError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapingError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
