//! Phase 1: brainstorm the topic, then validate the framing.

use super::{PhaseExecutor, PhaseInput, default_prompt};
use aigenflow_domain::{AgentResponse, PhaseKind, PhaseTask};

pub struct FramingPhase;

impl PhaseExecutor for FramingPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Framing
    }

    fn build_prompt(&self, input: &PhaseInput<'_>, task: PhaseTask, earlier: &[AgentResponse]) -> String {
        let lead = match task {
            PhaseTask::BrainstormChatGpt => {
                "You are framing a new document. List the problem, the audience and the key questions it must answer."
            }
            _ => "Review the framing below. Point out gaps, weak assumptions and missing questions.",
        };
        format!("{lead}\n\n{}", default_prompt(input, task, earlier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigenflow_domain::PipelineConfig;

    #[test]
    fn test_validate_prompt_mentions_review() {
        let config = PipelineConfig::new("AI-powered logistics platform");
        let input = PhaseInput {
            session_id: "s",
            number: 1,
            config: &config,
            context: "",
        };
        let prompt = FramingPhase.build_prompt(&input, PhaseTask::ValidateClaude, &[]);
        assert!(prompt.starts_with("Review the framing"));
        assert!(prompt.contains("AI-powered logistics platform"));
    }
}
