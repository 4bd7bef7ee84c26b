//! Chunked analysis of a news table through the chat session.

pub mod batcher;
pub mod error;
pub mod prompt;

pub use batcher::{AnalysisBatcher, AnalysisChunk, AnalysisReport, BatchConfig, plan_chunks};
pub use error::AnalysisError;
pub use prompt::{CHUNK_SEPARATOR, MISSING_ARTICLE_PLACEHOLDER, build_prompt};
