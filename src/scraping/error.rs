//! Error types for the scraping module.

use thiserror::Error;

/// Errors that can occur while harvesting news pages.
#[derive(Debug, Error)]
pub enum ScrapingError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// A page answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A configured CSS selector does not parse.
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector {
        /// Selector source text.
        selector: String,
        /// Parser message.
        reason: String,
    },
}

impl ScrapingError {
    /// Whether the failure came from the network rather than configuration.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::HttpRequest(_) | Self::HttpStatus { .. })
    }
}
