//! Cross-phase context chain.
//!
//! Before phase *k* runs, [`ContextChain`] renders the latest completed
//! result of every phase `1..k-1` into one bounded text block:
//!
//! ```text
//! Topic: <topic>
//! Document type: bizplan | Language: ko
//!
//! ## Phase 1: Framing
//! Task 1 (chatgpt): brainstorm_chatgpt
//! <preview, at most preview_chars>
//!
//! Summary: <phase summary>
//! ```
//!
//! Only previews are included, never full response text.

use crate::context::budget::ContextSettings;
use crate::pipeline::entities::PipelineSession;
use crate::pipeline::result::PhaseResult;
use crate::util::preview;

/// Rendered context for one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextChain {
    text: String,
    phases_included: usize,
}

impl ContextChain {
    /// Build the chain for phase `number` of `session`.
    pub fn for_phase(session: &PipelineSession, number: u8, settings: &ContextSettings) -> Self {
        let config = session.config();
        let mut text = format!(
            "Topic: {}\nDocument type: {} | Template: {} | Language: {}\n",
            config.topic(),
            config.doc_type(),
            config.template(),
            config.language()
        );

        let prior = session.prior_results(number);
        for result in &prior {
            text.push('\n');
            text.push_str(&render_phase(result, settings.preview_chars()));
        }

        Self {
            text,
            phases_included: prior.len(),
        }
    }

    /// Wrap already-reduced text (e.g. summarizer output)
    pub fn from_text(text: impl Into<String>, phases_included: usize) -> Self {
        Self {
            text: text.into(),
            phases_included,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn phases_included(&self) -> usize {
        self.phases_included
    }
}

fn render_phase(result: &PhaseResult, preview_chars: usize) -> String {
    let mut out = format!("## Phase {}: {}\n", result.phase_number, result.name);
    for (i, response) in result.successful_responses().enumerate() {
        out.push_str(&format!(
            "Task {} ({}): {}\n{}\n\n",
            i + 1,
            response.provider,
            response.task,
            preview(response.content.trim(), preview_chars)
        ));
    }
    if !result.summary.is_empty() {
        out.push_str(&format!("Summary: {}\n", result.summary));
    }
    out
}
