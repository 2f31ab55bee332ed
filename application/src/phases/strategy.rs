//! Phase 3: SWOT analysis followed by the narrative.

use super::{PhaseExecutor, PhaseInput, default_prompt};
use aigenflow_domain::{AgentResponse, PhaseKind, PhaseTask};

pub struct StrategyPhase;

impl PhaseExecutor for StrategyPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Strategy
    }

    fn build_prompt(&self, input: &PhaseInput<'_>, task: PhaseTask, earlier: &[AgentResponse]) -> String {
        let lead = match task {
            PhaseTask::SwotChatGpt => "Using the research in the context, write a SWOT analysis.",
            _ => "Turn the analysis into a strategic narrative with a clear positioning statement.",
        };
        format!("{lead}\n\n{}", default_prompt(input, task, earlier))
    }
}
