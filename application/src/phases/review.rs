//! Phase 5: verification, final review and polish, run concurrently.

use super::{PhaseExecutor, PhaseInput, default_prompt};
use aigenflow_domain::{AgentResponse, PhaseKind, PhaseTask};
use std::collections::BTreeMap;

pub struct ReviewPhase;

impl PhaseExecutor for ReviewPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Review
    }

    fn build_prompt(&self, input: &PhaseInput<'_>, task: PhaseTask, earlier: &[AgentResponse]) -> String {
        let lead = match task {
            PhaseTask::VerifyPerplexity => "Verify every figure and claim in the draft. List anything you cannot confirm.",
            PhaseTask::FinalReviewClaude => "Review the draft for structure, consistency and persuasiveness.",
            _ => "Produce the final polished version of the document.",
        };
        format!("{lead}\n\n{}", default_prompt(input, task, earlier))
    }

    fn artifacts(&self, served: &[AgentResponse]) -> BTreeMap<String, String> {
        let mut artifacts = BTreeMap::new();
        for response in served {
            let name = match response.task {
                PhaseTask::VerifyPerplexity => "verification",
                PhaseTask::FinalReviewClaude => "review_notes",
                PhaseTask::PolishClaude => "final_document",
                _ => continue,
            };
            artifacts.insert(name.to_string(), response.content.clone());
        }
        artifacts
    }
}
