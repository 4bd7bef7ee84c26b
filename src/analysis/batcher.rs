//! Batcher that feeds an article table through the session controller,
//! one chunk per prompt, strictly in order.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::AnalysisError;
use super::prompt::{build_prompt, join_articles};
use crate::chat::{ChatMessage, DeltaSink, Session, SessionController};
use crate::dataset::{ARTICLE_COLUMN, ArticleTable};

/// Chunking policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Rows per chunk.
    pub chunk_size: usize,
    /// Exclusive bound on chunk start rows; `None` covers the whole table.
    pub start_bound: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2,
            start_bound: None,
        }
    }
}

impl BatchConfig {
    /// Start bound 3 with two rows per chunk: chunks start at rows `0` and `2` only.
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            chunk_size: 2,
            start_bound: Some(3),
        }
    }

    /// Set rows per chunk.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the exclusive bound on chunk starts.
    #[must_use]
    pub const fn with_start_bound(mut self, bound: Option<usize>) -> Self {
        self.start_bound = bound;
        self
    }

    /// Check that the policy can produce chunks.
    ///
    /// # Errors
    /// Returns an error if `chunk_size` is zero.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.chunk_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One group of rows turned into a prompt body.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AnalysisChunk {
    /// Zero-based position in the batch.
    pub index: usize,
    /// Table rows covered.
    pub rows: Range<usize>,
    /// Joined article text.
    pub text: String,
}

/// Split an article column into chunks.
///
/// Chunk starts are `0, n, 2n, ...` below `min(start_bound, rows)`; each
/// chunk runs to `start + n` or the end of the column.
#[must_use]
pub fn plan_chunks(articles: &[Option<&str>], config: &BatchConfig) -> Vec<AnalysisChunk> {
    let size = config.chunk_size.max(1);
    let bound = config
        .start_bound
        .map_or(articles.len(), |b| b.min(articles.len()));

    (0..bound)
        .step_by(size)
        .enumerate()
        .map(|(index, start)| {
            let end = (start + size).min(articles.len());
            AnalysisChunk {
                index,
                rows: start..end,
                text: join_articles(&articles[start..end]),
            }
        })
        .collect()
}

/// Outcome of one analysis run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalysisReport {
    /// Chunks the table was split into.
    pub chunks_planned: usize,
    /// Chunks whose generation finished, cancelled one included.
    pub chunks_completed: usize,
    /// Whether a stop request ended the batch.
    pub cancelled: bool,
    /// Reply text per completed chunk.
    pub responses: Vec<String>,
}

/// Runs chunked analysis against a session.
#[derive(Clone)]
pub struct AnalysisBatcher {
    controller: SessionController,
    config: BatchConfig,
}

impl AnalysisBatcher {
    /// Create a batcher.
    #[must_use]
    pub const fn new(controller: SessionController, config: BatchConfig) -> Self {
        Self { controller, config }
    }

    /// Active chunking policy.
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Analyze the table's `article` column, one prompt per chunk.
    ///
    /// Every prompt is appended to the session as a user turn and answered
    /// before the next chunk starts.
    ///
    /// # Errors
    /// Returns [`AnalysisError::MissingColumn`] before any generation when
    /// the table has no `article` column, or [`AnalysisError::Generation`]
    /// when a chunk fails.
    pub async fn analyze<S>(
        &self,
        session: &mut Session,
        table: &ArticleTable,
        model: &str,
        sink: &mut S,
    ) -> Result<AnalysisReport, AnalysisError>
    where
        S: DeltaSink + ?Sized,
    {
        self.config.validate()?;
        let articles = table
            .column(ARTICLE_COLUMN)
            .ok_or_else(|| AnalysisError::MissingColumn(ARTICLE_COLUMN.to_string()))?;

        let chunks = plan_chunks(&articles, &self.config);
        info!(
            rows = table.len(),
            chunks = chunks.len(),
            chunk_size = self.config.chunk_size,
            "Analyzing CSV"
        );

        let mut report = AnalysisReport {
            chunks_planned: chunks.len(),
            ..AnalysisReport::default()
        };

        for chunk in chunks {
            let prompt = ChatMessage::user(build_prompt(&chunk.text));
            sink.prompt_injected(&prompt);
            session.push(prompt);

            match self.controller.respond(session, model, sink).await {
                Ok(generation) => {
                    let cancelled = generation.is_cancelled();
                    report.chunks_completed += 1;
                    report.responses.push(generation.text);
                    if cancelled {
                        warn!(chunk = chunk.index, "Analysis stopped");
                        report.cancelled = true;
                        break;
                    }
                }
                Err(source) => {
                    return Err(AnalysisError::Generation {
                        chunk: chunk.index,
                        source,
                    });
                }
            }
        }

        Ok(report)
    }
}
