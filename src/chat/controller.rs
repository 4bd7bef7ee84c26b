//! Session controller: turns a session history into one streamed reply.
//!
//! The controller republishes the full accumulated text after every delta,
//! polls the session's cancel flag at delta boundaries, and appends the
//! final text as exactly one assistant message.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info};

use super::error::ChatError;
use super::message::ChatMessage;
use super::session::Session;
use crate::llm::CompletionClient;

/// Receives the in-progress reply.
pub trait DeltaSink {
    /// Called after every delta with the whole text accumulated so far.
    fn publish(&mut self, accumulated: &str);

    /// Called when a prompt is appended to the session on the user's behalf.
    fn prompt_injected(&mut self, _prompt: &ChatMessage) {}
}

impl<F: FnMut(&str)> DeltaSink for F {
    fn publish(&mut self, accumulated: &str) {
        self(accumulated);
    }
}

/// Sink that discards every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DeltaSink for NullSink {
    fn publish(&mut self, _accumulated: &str) {}
}

/// How a generation ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationOutcome {
    /// The stream was exhausted.
    Completed,
    /// A stop was requested; the text is what arrived before it.
    Cancelled,
}

/// Result of one generation.
#[derive(Clone, Debug)]
pub struct GenerationReport {
    /// Final reply text, also appended to the session.
    pub text: String,
    /// How the stream ended.
    pub outcome: GenerationOutcome,
    /// Number of deltas consumed.
    pub deltas: usize,
    /// Wall time from request to last consumed delta.
    pub elapsed: Duration,
}

impl GenerationReport {
    /// Elapsed time in seconds.
    #[must_use]
    pub const fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Whether the reply was cut short by a stop request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.outcome == GenerationOutcome::Cancelled
    }
}

/// Drives a [`CompletionClient`] against explicit [`Session`] values.
#[derive(Clone)]
pub struct SessionController {
    client: Arc<dyn CompletionClient>,
}

impl SessionController {
    /// Create a controller on top of a completion client.
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Underlying completion client.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn CompletionClient> {
        &self.client
    }

    /// Stream a reply to the newest user message.
    ///
    /// On success the reply (partial when cancelled) is appended as one
    /// assistant message. On failure nothing is appended.
    ///
    /// # Errors
    /// Returns [`ChatError::NothingToAnswer`] if the session tail is not a
    /// user message, or the stream error that ended the generation.
    pub async fn generate_response<S>(
        &self,
        session: &mut Session,
        model: &str,
        sink: &mut S,
    ) -> Result<GenerationReport, ChatError>
    where
        S: DeltaSink + ?Sized,
    {
        if !session.awaits_reply() {
            return Err(ChatError::NothingToAnswer);
        }

        let cancel = session.cancel_flag();
        cancel.reset();
        let started = Instant::now();
        info!(model, session = %session.id(), "Generating response");

        let mut stream = match self.client.stream(model, session.messages()).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(transport = err.is_transport(), "Error during streaming: {err}");
                return Err(err);
            }
        };

        let mut text = String::new();
        let mut deltas = 0_usize;
        let mut outcome = GenerationOutcome::Completed;

        while let Some(item) = stream.next().await {
            let delta = match item {
                Ok(delta) => delta,
                Err(err) => {
                    error!(deltas, transport = err.is_transport(), "Error during streaming: {err}");
                    return Err(err);
                }
            };

            deltas += 1;
            text.push_str(&delta.content);
            sink.publish(&text);

            if cancel.is_requested() {
                outcome = GenerationOutcome::Cancelled;
                break;
            }
        }

        let elapsed = started.elapsed();
        info!(
            model,
            messages = ?session.messages(),
            response = %text,
            ?outcome,
            "Duration: {:.2} seconds",
            elapsed.as_secs_f64()
        );

        session.push_assistant(text.clone());

        Ok(GenerationReport {
            text,
            outcome,
            deltas,
            elapsed,
        })
    }

    /// Like [`Self::generate_response`], but a failed generation is recorded
    /// as the assistant turn, its content being the error text.
    ///
    /// # Errors
    /// Returns the same errors as [`Self::generate_response`].
    pub async fn respond<S>(
        &self,
        session: &mut Session,
        model: &str,
        sink: &mut S,
    ) -> Result<GenerationReport, ChatError>
    where
        S: DeltaSink + ?Sized,
    {
        match self.generate_response(session, model, sink).await {
            Ok(report) => Ok(report),
            Err(ChatError::NothingToAnswer) => Err(ChatError::NothingToAnswer),
            Err(err) => {
                session.push_assistant(err.to_string());
                Err(err)
            }
        }
    }

    /// Append the user's message and answer it.
    ///
    /// # Errors
    /// Returns the stream error that ended the generation; the session then
    /// ends with the error text as the assistant turn.
    pub async fn chat<S>(
        &self,
        session: &mut Session,
        model: &str,
        user_text: impl Into<String>,
        sink: &mut S,
    ) -> Result<GenerationReport, ChatError>
    where
        S: DeltaSink + ?Sized,
    {
        let content = user_text.into();
        info!("User input: {content}");
        session.push_user(content);
        self.respond(session, model, sink).await
    }
}
