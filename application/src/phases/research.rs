//! Phase 2: deep search and fact check, run concurrently.

use super::{PhaseExecutor, PhaseInput, default_prompt};
use aigenflow_domain::{AgentResponse, PhaseKind, PhaseTask};

pub struct ResearchPhase;

impl PhaseExecutor for ResearchPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Research
    }

    fn build_prompt(&self, input: &PhaseInput<'_>, task: PhaseTask, earlier: &[AgentResponse]) -> String {
        let lead = match task {
            PhaseTask::DeepSearchGemini => {
                "Research the market, competitors and relevant data for the framing in the context."
            }
            _ => "Check the claims made so far against current public sources. Cite each source.",
        };
        format!("{lead}\n\n{}", default_prompt(input, task, earlier))
    }
}
