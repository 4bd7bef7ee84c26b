//! Process configuration read from `ECONEWS_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::analysis::BatchConfig;
use crate::llm::ollama::{DEFAULT_OLLAMA_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::llm::{DEFAULT_MODEL, ExecutionMode};
use crate::scraping::HarvestConfig;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default directory served at `/`.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable holds a value that does not parse or is out of range.
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// What was expected.
        reason: String,
    },

    /// A variable holds a malformed URL.
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        /// Variable name.
        var: &'static str,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
}

/// Everything the server needs to start.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Ollama base URL.
    pub ollama_url: String,
    /// Listening port.
    pub port: u16,
    /// Model used when a request names none.
    pub default_model: String,
    /// Completion timeout, applied to the response head and between deltas.
    pub request_timeout: Duration,
    /// Execution-mode hint.
    pub execution_mode: ExecutionMode,
    /// Directory holding the web page.
    pub static_dir: PathBuf,
    /// News harvester settings.
    pub harvest: HarvestConfig,
    /// Analysis chunking.
    pub batch: BatchConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            port: DEFAULT_PORT,
            default_model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            execution_mode: ExecutionMode::default(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            harvest: HarvestConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Read the process environment.
    ///
    /// # Errors
    /// Returns an error if a set variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if a present value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("ECONEWS_OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Some(port) = get("ECONEWS_PORT") {
            config.port = parse_var("ECONEWS_PORT", &port)?;
        }
        if let Some(model) = get("ECONEWS_MODEL") {
            config.default_model = model;
        }
        if let Some(secs) = get("ECONEWS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_var("ECONEWS_REQUEST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(mode) = get("ECONEWS_EXECUTION_MODE") {
            config.execution_mode = mode.parse().map_err(|reason| ConfigError::Invalid {
                var: "ECONEWS_EXECUTION_MODE",
                value: mode.clone(),
                reason,
            })?;
        }
        if let Some(dir) = get("ECONEWS_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("ECONEWS_LISTING_URL") {
            config.harvest = config.harvest.with_listing_url(url);
        }
        if let Some(size) = get("ECONEWS_CHUNK_SIZE") {
            config.batch = config.batch.with_chunk_size(parse_var("ECONEWS_CHUNK_SIZE", &size)?);
        }
        if let Some(bound) = get("ECONEWS_CHUNK_START_BOUND") {
            let bound = if bound.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_var("ECONEWS_CHUNK_START_BOUND", &bound)?)
            };
            config.batch = config.batch.with_start_bound(bound);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.ollama_url).map_err(|source| ConfigError::InvalidUrl {
            var: "ECONEWS_OLLAMA_URL",
            source,
        })?;
        Url::parse(&self.harvest.listing_url).map_err(|source| ConfigError::InvalidUrl {
            var: "ECONEWS_LISTING_URL",
            source,
        })?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "ECONEWS_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        if self.batch.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                var: "ECONEWS_CHUNK_SIZE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
