//! Configuration for the news harvester.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Listing page scraped by default.
pub const DEFAULT_LISTING_URL: &str = "https://www.moneydj.com/kmdj/news/newsreallist.aspx?a=mb020000";
/// Root that article links are resolved against.
pub const DEFAULT_ARTICLE_ROOT: &str = "https://www.moneydj.com/";

/// Configuration for [`super::NewsHarvester`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Listing page holding the article links.
    pub listing_url: String,
    /// Base URL that relative article links are joined onto.
    pub article_root: String,
    /// Selector for article anchors on the listing page.
    pub link_selector: String,
    /// Selector for the title on an article page.
    pub title_selector: String,
    /// Selector for the body on an article page.
    pub article_selector: String,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Whole-request timeout; `None` waits as long as the server does.
    #[serde(with = "option_duration_serde")]
    pub request_timeout: Option<Duration>,
    /// User agents to rotate.
    pub user_agents: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            article_root: DEFAULT_ARTICLE_ROOT.to_string(),
            link_selector: ".forumgrid tr a".to_string(),
            title_selector: "h1".to_string(),
            article_selector: "article".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agents: default_user_agents(),
        }
    }
}

impl HarvestConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listing page.
    #[must_use]
    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = url.into();
        self
    }

    /// Set the root for article links.
    #[must_use]
    pub fn with_article_root(mut self, root: impl Into<String>) -> Self {
        self.article_root = root.into();
        self
    }

    /// Set the listing, title and body selectors.
    #[must_use]
    pub fn with_selectors(
        mut self,
        link: impl Into<String>,
        title: impl Into<String>,
        article: impl Into<String>,
    ) -> Self {
        self.link_selector = link.into();
        self.title_selector = title.into();
        self.article_selector = article.into();
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Get a random user agent from the rotation list.
    #[must_use]
    pub fn random_user_agent(&self) -> String {
        if self.user_agents.is_empty() {
            return default_user_agents().swap_remove(0);
        }
        let mut rng = rand::thread_rng();
        let idx = rng.gen_range(0..self.user_agents.len());
        self.user_agents[idx].clone()
    }
}

/// Default user agents for rotation.
fn default_user_agents() -> Vec<String> {
    vec![
        // Chrome on Windows
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
        // Safari on macOS
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".to_string(),
        // Firefox on Linux
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
    ]
}

/// Durations as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)] // signature fixed by `serde(with)`
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
