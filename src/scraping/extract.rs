//! HTML extraction for listing and article pages.
//!
//! Everything here is synchronous: a parsed [`Html`] document is not
//! `Send`, so it never lives across an await point.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::config::HarvestConfig;
use super::error::ScrapingError;
use super::types::ArticleRecord;

/// Compiled selectors for one harvest.
#[derive(Clone, Debug)]
pub struct PageSelectors {
    link: Selector,
    title: Selector,
    article: Selector,
}

impl PageSelectors {
    /// Compile the selectors named in the config.
    ///
    /// # Errors
    /// Returns an error if any selector does not parse.
    pub fn from_config(config: &HarvestConfig) -> Result<Self, ScrapingError> {
        Ok(Self {
            link: parse_selector(&config.link_selector)?,
            title: parse_selector(&config.title_selector)?,
            article: parse_selector(&config.article_selector)?,
        })
    }
}

fn parse_selector(source: &str) -> Result<Selector, ScrapingError> {
    Selector::parse(source).map_err(|e| ScrapingError::InvalidSelector {
        selector: source.to_string(),
        reason: e.to_string(),
    })
}

/// Article URLs on a listing page, in document order.
///
/// Anchors without an `href` are skipped. Duplicates are kept.
///
/// # Errors
/// Returns an error on the first `href` that does not resolve against `root`.
pub fn extract_links(
    html: &str,
    selectors: &PageSelectors,
    root: &Url,
) -> Result<Vec<Url>, ScrapingError> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(&selectors.link) {
        let Some(href) = element.value().attr("href") else {
            debug!("Skipping anchor without href");
            continue;
        };
        links.push(root.join(href)?);
    }

    Ok(links)
}

/// Title and body of an article page, with placeholders for missing parts.
#[must_use]
pub fn extract_article(html: &str, selectors: &PageSelectors) -> ArticleRecord {
    let document = Html::parse_document(html);
    let text_of = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>())
    };

    ArticleRecord::new(text_of(&selectors.title), text_of(&selectors.article))
}
