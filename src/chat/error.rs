//! Error types for the chat session and the completion stream.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while opening or consuming a completion stream.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// The completion endpoint answered with a non-success status.
    #[error("completion endpoint returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the endpoint.
        body: String,
    },

    /// No response start or no delta arrived within the request timeout.
    #[error("completion stream timed out after {0:?}")]
    Timeout(Duration),

    /// A stream line could not be decoded.
    #[error("malformed stream chunk: {0}")]
    MalformedChunk(#[from] serde_json::Error),

    /// The model reported an error in the middle of the stream.
    #[error("model error: {0}")]
    Model(String),

    /// Endpoint URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Generation was requested while the session tail is not a user message.
    #[error("no user message is waiting for a reply")]
    NothingToAnswer,
}

impl ChatError {
    /// Whether the failure happened on the transport rather than in the model.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpRequest(_) | Self::HttpStatus { .. } | Self::Timeout(_)
        )
    }
}
