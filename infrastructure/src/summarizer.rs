//! Local context summarizer.
//!
//! Shrinks each `## Phase k` section of the context chain proportionally,
//! keeping the head and tail of every section so headers and phase
//! summaries survive. No provider call is involved.

use aigenflow_application::{ContextSummarizer, SummarizeError};
use aigenflow_domain::util::truncate_head_tail;
use async_trait::async_trait;

const SECTION_MARKER: &str = "\n## ";

/// Sections are never cut below this many bytes
const MIN_SECTION_BYTES: usize = 256;

#[derive(Debug, Default, Clone, Copy)]
pub struct TruncatingSummarizer;

impl TruncatingSummarizer {
    pub fn new() -> Self {
        Self
    }
}

/// Split `context` before every section header, keeping the headers.
fn sections(context: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, _) in context.match_indices(SECTION_MARKER) {
        // Split after the newline so the header starts its own section
        let cut = idx + 1;
        if cut > start {
            out.push(&context[start..cut]);
            start = cut;
        }
    }
    out.push(&context[start..]);
    out.retain(|s| !s.is_empty());
    out
}

#[async_trait]
impl ContextSummarizer for TruncatingSummarizer {
    async fn summarize(&self, context: &str, target_ratio: f64) -> Result<String, SummarizeError> {
        if !(target_ratio > 0.0 && target_ratio < 1.0) {
            return Err(SummarizeError(format!(
                "target ratio must be between 0 and 1, got {target_ratio}"
            )));
        }

        let reduced: String = sections(context)
            .into_iter()
            .map(|section| {
                let budget = ((section.len() as f64) * target_ratio) as usize;
                truncate_head_tail(section, budget.max(MIN_SECTION_BYTES))
            })
            .collect();

        tracing::debug!(
            before = context.len(),
            after = reduced.len(),
            "Context summarized"
        );
        Ok(reduced)
    }
}
