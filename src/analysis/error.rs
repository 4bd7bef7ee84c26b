//! Error types for the analysis batcher.

use thiserror::Error;

use crate::chat::ChatError;
use crate::dataset::DatasetError;

/// Errors that end an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The table lacks the column to analyze.
    #[error("CSV has no '{0}' column")]
    MissingColumn(String),

    /// Batch settings are unusable.
    #[error("Invalid batch configuration: {0}")]
    InvalidConfig(String),

    /// A chunk's generation failed; later chunks were not started.
    #[error("Analysis of chunk {chunk} failed: {source}")]
    Generation {
        /// Zero-based chunk index.
        chunk: usize,
        /// Underlying completion error.
        #[source]
        source: ChatError,
    },

    /// The uploaded CSV could not be read.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
