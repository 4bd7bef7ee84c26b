//! Records produced by the news harvester.

use serde::{Deserialize, Serialize};

/// Title used when an article page has no `h1`.
pub const NO_TITLE: &str = "No title";
/// Body used when an article page has no `article` element.
pub const NO_CONTENT: &str = "No content";

/// One scraped article, in crawl order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Text of the first heading.
    pub title: String,
    /// Text of the article body.
    pub article: String,
}

impl ArticleRecord {
    /// Create a record, substituting the placeholders for missing parts.
    #[must_use]
    pub fn new(title: Option<String>, article: Option<String>) -> Self {
        Self {
            title: title.unwrap_or_else(|| NO_TITLE.to_string()),
            article: article.unwrap_or_else(|| NO_CONTENT.to_string()),
        }
    }

    /// Whether the page had no article body.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.article == NO_CONTENT
    }
}
