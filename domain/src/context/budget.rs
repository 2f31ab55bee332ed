//! Context budget for the cross-phase context chain.
//!
//! [`ContextSettings`] bounds how much prior-phase output is passed into the
//! next phase. Each prior response is previewed rather than copied, and once
//! the assembled chain crosses `summarize_threshold_bytes` the orchestrator
//! asks the summarizer to shrink it to `target_ratio` of its size.

use serde::{Deserialize, Serialize};

/// Budget controlling context-chain size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSettings {
    summarize_threshold_bytes: usize,
    target_ratio: f64,
    preview_chars: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            summarize_threshold_bytes: 24_000,
            target_ratio: 0.5,
            preview_chars: 500,
        }
    }
}

impl ContextSettings {
    pub fn new(summarize_threshold_bytes: usize, target_ratio: f64, preview_chars: usize) -> Self {
        Self {
            summarize_threshold_bytes,
            target_ratio,
            preview_chars,
        }
    }

    /// Never summarize; previews still apply.
    pub fn unlimited() -> Self {
        Self {
            summarize_threshold_bytes: usize::MAX,
            ..Default::default()
        }
    }

    // ==================== Accessors ====================

    pub fn summarize_threshold_bytes(&self) -> usize {
        self.summarize_threshold_bytes
    }

    pub fn target_ratio(&self) -> f64 {
        self.target_ratio
    }

    pub fn preview_chars(&self) -> usize {
        self.preview_chars
    }

    // ==================== Builders ====================

    pub fn with_summarize_threshold_bytes(mut self, bytes: usize) -> Self {
        self.summarize_threshold_bytes = bytes;
        self
    }

    pub fn with_target_ratio(mut self, ratio: f64) -> Self {
        self.target_ratio = ratio;
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    // ==================== Policy ====================

    pub fn needs_summary(&self, context_bytes: usize) -> bool {
        context_bytes > self.summarize_threshold_bytes
    }

    /// Size the summarizer should aim for
    pub fn target_bytes(&self, context_bytes: usize) -> usize {
        (context_bytes as f64 * self.target_ratio).round() as usize
    }

    /// Validate the budget and return a list of problems (empty if valid).
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.summarize_threshold_bytes == 0 {
            issues.push("context.summarize_threshold_bytes must be > 0".to_string());
        }
        if !(self.target_ratio > 0.0 && self.target_ratio < 1.0) {
            issues.push(format!(
                "context.target_ratio ({}) must be between 0 and 1 (exclusive)",
                self.target_ratio
            ));
        }
        if self.preview_chars == 0 {
            issues.push("context.preview_chars must be > 0".to_string());
        }
        issues
    }
}
