//! Streaming completion clients.
//!
//! A [`CompletionClient`] turns a full message history into a lazy,
//! non-restartable [`DeltaStream`]. The Ollama implementation lives in
//! [`ollama`].

pub mod device;
pub mod ollama;
#[cfg(test)]
pub(crate) mod scripted;

use std::pin::Pin;

use futures::Stream;
use serde::Serialize;

use crate::chat::error::ChatError;
use crate::chat::message::ChatMessage;

pub use device::{Device, ExecutionMode};
pub use ollama::OllamaClient;

/// Models offered by the model selector.
pub const AVAILABLE_MODELS: [&str; 2] = ["llama3.1:8b-instruct-q4_K_M", "llama3.2:3b"];

/// Model selected when nothing else is configured.
pub const DEFAULT_MODEL: &str = AVAILABLE_MODELS[0];

/// Whether `model` is one of [`AVAILABLE_MODELS`].
#[must_use]
pub fn is_known_model(model: &str) -> bool {
    AVAILABLE_MODELS.contains(&model)
}

/// One incremental fragment of a streamed reply.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StreamDelta {
    /// Text to append to the reply so far.
    pub content: String,
}

impl StreamDelta {
    /// Wrap a fragment.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Lazy sequence of deltas; the end of the stream is the end of the reply.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, ChatError>> + Send>>;

/// A chat-completion endpoint that streams its reply.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Open a streaming completion for `messages` on `model`.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent or is rejected before
    /// streaming starts. Later failures surface as stream items.
    async fn stream(&self, model: &str, messages: &[ChatMessage]) -> Result<DeltaStream, ChatError>;

    /// Whether the endpoint currently answers.
    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models() {
        assert!(is_known_model("llama3.2:3b"));
        assert!(is_known_model(DEFAULT_MODEL));
        assert!(!is_known_model("gpt-4o"));
    }
}
