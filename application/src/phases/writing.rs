//! Phase 4: draft the document, its outline and chart descriptions.

use super::{PhaseExecutor, PhaseInput, default_prompt};
use aigenflow_domain::{AgentResponse, PhaseKind, PhaseTask};
use std::collections::BTreeMap;

pub struct WritingPhase;

impl WritingPhase {
    fn artifact_name(task: PhaseTask) -> Option<&'static str> {
        match task {
            PhaseTask::BusinessPlanClaude => Some("draft"),
            PhaseTask::OutlineChatGpt => Some("outline"),
            PhaseTask::ChartsGemini => Some("charts"),
            _ => None,
        }
    }
}

impl PhaseExecutor for WritingPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Writing
    }

    fn build_prompt(&self, input: &PhaseInput<'_>, task: PhaseTask, earlier: &[AgentResponse]) -> String {
        let lead = match task {
            PhaseTask::BusinessPlanClaude => {
                "Write the full document, section by section, based on the strategy in the context."
            }
            PhaseTask::OutlineChatGpt => "Produce a numbered outline of the draft below.",
            _ => "Describe the charts and tables the document needs, with the data each one shows.",
        };
        format!("{lead}\n\n{}", default_prompt(input, task, earlier))
    }

    fn artifacts(&self, served: &[AgentResponse]) -> BTreeMap<String, String> {
        served
            .iter()
            .filter_map(|r| Self::artifact_name(r.task).map(|name| (name.to_string(), r.content.clone())))
            .collect()
    }
}
