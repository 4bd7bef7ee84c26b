//! Scripted completion client used by unit tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;

use crate::chat::error::ChatError;
use crate::chat::message::ChatMessage;

use super::{CompletionClient, DeltaStream, StreamDelta};

/// One scripted stream item.
#[derive(Clone, Debug)]
pub(crate) enum Step {
    Delta(&'static str),
    Fail(&'static str),
}

/// Replays the same script on every call and records what it was asked.
pub(crate) struct ScriptedClient {
    script: Vec<Step>,
    refuse: Option<&'static str>,
    calls: AtomicUsize,
    consumed: Arc<AtomicUsize>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    pub(crate) fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            refuse: None,
            calls: AtomicUsize::new(0),
            consumed: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn deltas(parts: &[&'static str]) -> Self {
        Self::new(parts.iter().copied().map(Step::Delta).collect())
    }

    /// Fail when the stream is opened.
    pub(crate) fn refusing(message: &'static str) -> Self {
        let mut client = Self::new(Vec::new());
        client.refuse = Some(message);
        client
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Items pulled out of all streams so far.
    pub(crate) fn consumed(&self) -> usize {
        self.consumed.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl CompletionClient for ScriptedClient {
    async fn stream(&self, _model: &str, messages: &[ChatMessage]) -> Result<DeltaStream, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        if let Some(message) = self.refuse {
            return Err(ChatError::Model(message.to_string()));
        }

        let consumed = Arc::clone(&self.consumed);
        let items = self.script.clone().into_iter().map(|step| match step {
            Step::Delta(text) => Ok(StreamDelta::new(text)),
            Step::Fail(message) => Err(ChatError::Model(message.to_string())),
        });
        let stream = futures::stream::iter(items).inspect(move |_| {
            consumed.fetch_add(1, Ordering::SeqCst);
        });
        Ok(Box::pin(stream))
    }
}
