//! Server-sent events emitted while a generation runs.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::analysis::AnalysisReport;
use crate::chat::{CancelFlag, ChatMessage, DeltaSink, GenerationOutcome, GenerationReport};
use crate::dataset::ArticleTable;

/// One frame of a chat or analysis stream.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Contents of the table about to be analyzed.
    Table {
        /// Column names.
        headers: Vec<String>,
        /// Raw rows.
        rows: Vec<Vec<String>>,
    },
    /// A prompt was appended on the user's behalf.
    Prompt {
        /// Prompt text.
        content: String,
    },
    /// Full reply text so far.
    Partial {
        /// Accumulated text.
        text: String,
    },
    /// The reply is final and recorded.
    Done {
        /// Final text.
        text: String,
        /// How the stream ended.
        outcome: GenerationOutcome,
        /// Generation time in seconds.
        elapsed_secs: f64,
    },
    /// Generation failed.
    Error {
        /// Error text, also recorded as the reply.
        message: String,
    },
    /// An analysis batch ended.
    AnalysisDone {
        /// Chunks planned.
        chunks_planned: usize,
        /// Chunks answered.
        chunks_completed: usize,
        /// Whether a stop ended the batch.
        cancelled: bool,
    },
}

impl SessionEvent {
    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Table { .. } => "table",
            Self::Prompt { .. } => "prompt",
            Self::Partial { .. } => "partial",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::AnalysisDone { .. } => "analysis_done",
        }
    }

    /// Snapshot of an uploaded or harvested table.
    #[must_use]
    pub fn table(table: &ArticleTable) -> Self {
        Self::Table {
            headers: table.headers().to_vec(),
            rows: table.rows().to_vec(),
        }
    }

    /// Final frame of a single generation.
    #[must_use]
    pub fn done(report: &GenerationReport) -> Self {
        Self::Done {
            text: report.text.clone(),
            outcome: report.outcome,
            elapsed_secs: report.elapsed_secs(),
        }
    }

    /// Final frame of an analysis batch.
    #[must_use]
    pub const fn analysis_done(report: &AnalysisReport) -> Self {
        Self::AnalysisDone {
            chunks_planned: report.chunks_planned,
            chunks_completed: report.chunks_completed,
            cancelled: report.cancelled,
        }
    }

    fn into_sse(self) -> Event {
        let name = self.name();
        Event::default()
            .event(name)
            .json_data(&self)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
    }
}

/// [`DeltaSink`] that forwards frames to an SSE response.
///
/// A closed channel means the client went away; the sink then requests a
/// stop so the generation ends at the next delta.
pub struct ChannelSink {
    tx: UnboundedSender<SessionEvent>,
    cancel: CancelFlag,
}

impl ChannelSink {
    /// Create a sink and the receiving half for [`sse_response`].
    #[must_use]
    pub fn channel(cancel: CancelFlag) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx, cancel }, rx)
    }

    /// Send a frame.
    pub fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            self.cancel.request();
        }
    }
}

impl DeltaSink for ChannelSink {
    fn publish(&mut self, accumulated: &str) {
        self.send(SessionEvent::Partial {
            text: accumulated.to_string(),
        });
    }

    fn prompt_injected(&mut self, prompt: &ChatMessage) {
        self.send(SessionEvent::Prompt {
            content: prompt.content.clone(),
        });
    }
}

/// Turn a frame channel into an SSE response that ends with the channel.
pub fn sse_response(
    rx: UnboundedReceiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await;
        event.map(|event| (Ok::<_, Infallible>(event.into_sse()), rx))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
