//! Context summarizer port

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Summarization failed: {0}")]
pub struct SummarizeError(pub String);

/// Reduces an accumulated context chain to roughly `target_ratio` of its size.
///
/// Callers treat failure as non-fatal and continue with the unreduced text.
#[async_trait]
pub trait ContextSummarizer: Send + Sync {
    async fn summarize(&self, context: &str, target_ratio: f64) -> Result<String, SummarizeError>;
}

/// Summarizer that returns the context unchanged
pub struct NoSummarizer;

#[async_trait]
impl ContextSummarizer for NoSummarizer {
    async fn summarize(&self, context: &str, _target_ratio: f64) -> Result<String, SummarizeError> {
        Ok(context.to_string())
    }
}
