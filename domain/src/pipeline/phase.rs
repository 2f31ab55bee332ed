//! Phases and the tasks each phase declares

use crate::core::provider::ProviderKind;
use serde::{Deserialize, Serialize};

/// How a phase runs its declared tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One task after another; each task sees the previous task's output
    Sequential,
    /// All tasks at once; responses are joined positionally
    Concurrent,
}

/// One ordered stage of the document pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Brainstorming and concept validation
    Framing,
    /// Deep search and fact checking
    Research,
    /// SWOT analysis and narrative
    Strategy,
    /// Document drafting, outline and charts
    Writing,
    /// Verification and final polish
    Review,
}

impl PhaseKind {
    /// All phases in pipeline order
    pub const ALL: [PhaseKind; 5] = [
        PhaseKind::Framing,
        PhaseKind::Research,
        PhaseKind::Strategy,
        PhaseKind::Writing,
        PhaseKind::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Framing => "framing",
            PhaseKind::Research => "research",
            PhaseKind::Strategy => "strategy",
            PhaseKind::Writing => "writing",
            PhaseKind::Review => "review",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PhaseKind::Framing => "Framing",
            PhaseKind::Research => "Research",
            PhaseKind::Strategy => "Strategy",
            PhaseKind::Writing => "Writing",
            PhaseKind::Review => "Review",
        }
    }

    /// Position of the phase in the full five-phase pipeline (1-based)
    pub fn ordinal(&self) -> u8 {
        match self {
            PhaseKind::Framing => 1,
            PhaseKind::Research => 2,
            PhaseKind::Strategy => 3,
            PhaseKind::Writing => 4,
            PhaseKind::Review => 5,
        }
    }

    /// Tasks in declaration order
    pub fn tasks(&self) -> &'static [PhaseTask] {
        match self {
            PhaseKind::Framing => &[PhaseTask::BrainstormChatGpt, PhaseTask::ValidateClaude],
            PhaseKind::Research => &[
                PhaseTask::DeepSearchGemini,
                PhaseTask::FactCheckPerplexity,
            ],
            PhaseKind::Strategy => &[PhaseTask::SwotChatGpt, PhaseTask::NarrativeClaude],
            PhaseKind::Writing => &[
                PhaseTask::BusinessPlanClaude,
                PhaseTask::OutlineChatGpt,
                PhaseTask::ChartsGemini,
            ],
            PhaseKind::Review => &[
                PhaseTask::VerifyPerplexity,
                PhaseTask::FinalReviewClaude,
                PhaseTask::PolishClaude,
            ],
        }
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        match self {
            PhaseKind::Research | PhaseKind::Review => ExecutionMode::Concurrent,
            PhaseKind::Framing | PhaseKind::Strategy | PhaseKind::Writing => {
                ExecutionMode::Sequential
            }
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        PhaseKind::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered || p.ordinal().to_string() == lowered)
            .ok_or_else(|| s.to_string())
    }
}

/// A unit of work delegated to a single provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseTask {
    BrainstormChatGpt,
    ValidateClaude,
    DeepSearchGemini,
    FactCheckPerplexity,
    SwotChatGpt,
    NarrativeClaude,
    BusinessPlanClaude,
    OutlineChatGpt,
    ChartsGemini,
    VerifyPerplexity,
    FinalReviewClaude,
    PolishClaude,
}

impl PhaseTask {
    pub const ALL: [PhaseTask; 12] = [
        PhaseTask::BrainstormChatGpt,
        PhaseTask::ValidateClaude,
        PhaseTask::DeepSearchGemini,
        PhaseTask::FactCheckPerplexity,
        PhaseTask::SwotChatGpt,
        PhaseTask::NarrativeClaude,
        PhaseTask::BusinessPlanClaude,
        PhaseTask::OutlineChatGpt,
        PhaseTask::ChartsGemini,
        PhaseTask::VerifyPerplexity,
        PhaseTask::FinalReviewClaude,
        PhaseTask::PolishClaude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseTask::BrainstormChatGpt => "brainstorm_chatgpt",
            PhaseTask::ValidateClaude => "validate_claude",
            PhaseTask::DeepSearchGemini => "deep_search_gemini",
            PhaseTask::FactCheckPerplexity => "fact_check_perplexity",
            PhaseTask::SwotChatGpt => "swot_chatgpt",
            PhaseTask::NarrativeClaude => "narrative_claude",
            PhaseTask::BusinessPlanClaude => "business_plan_claude",
            PhaseTask::OutlineChatGpt => "outline_chatgpt",
            PhaseTask::ChartsGemini => "charts_gemini",
            PhaseTask::VerifyPerplexity => "verify_perplexity",
            PhaseTask::FinalReviewClaude => "final_review_claude",
            PhaseTask::PolishClaude => "polish_claude",
        }
    }

    pub fn phase(&self) -> PhaseKind {
        match self {
            PhaseTask::BrainstormChatGpt | PhaseTask::ValidateClaude => PhaseKind::Framing,
            PhaseTask::DeepSearchGemini | PhaseTask::FactCheckPerplexity => PhaseKind::Research,
            PhaseTask::SwotChatGpt | PhaseTask::NarrativeClaude => PhaseKind::Strategy,
            PhaseTask::BusinessPlanClaude | PhaseTask::OutlineChatGpt | PhaseTask::ChartsGemini => {
                PhaseKind::Writing
            }
            PhaseTask::VerifyPerplexity | PhaseTask::FinalReviewClaude | PhaseTask::PolishClaude => {
                PhaseKind::Review
            }
        }
    }

    /// Provider the task is written for
    pub fn default_provider(&self) -> ProviderKind {
        match self {
            PhaseTask::BrainstormChatGpt | PhaseTask::SwotChatGpt | PhaseTask::OutlineChatGpt => {
                ProviderKind::ChatGpt
            }
            PhaseTask::ValidateClaude
            | PhaseTask::NarrativeClaude
            | PhaseTask::BusinessPlanClaude
            | PhaseTask::FinalReviewClaude
            | PhaseTask::PolishClaude => ProviderKind::Claude,
            PhaseTask::DeepSearchGemini | PhaseTask::ChartsGemini => ProviderKind::Gemini,
            PhaseTask::FactCheckPerplexity | PhaseTask::VerifyPerplexity => {
                ProviderKind::Perplexity
            }
        }
    }

    /// One-line instruction placed at the top of the task prompt
    pub fn instruction(&self) -> &'static str {
        match self {
            PhaseTask::BrainstormChatGpt => {
                "Brainstorm the core idea: problem, target customers, value proposition and business model options."
            }
            PhaseTask::ValidateClaude => {
                "Critically validate the brainstormed concept: feasibility, risks and the strongest framing."
            }
            PhaseTask::DeepSearchGemini => {
                "Research the market in depth: size, trends, competitors and supporting data."
            }
            PhaseTask::FactCheckPerplexity => {
                "Fact-check the key claims so far and cite current sources for each."
            }
            PhaseTask::SwotChatGpt => {
                "Produce a SWOT analysis grounded in the research findings."
            }
            PhaseTask::NarrativeClaude => {
                "Write the strategic narrative that ties the problem, solution and market together."
            }
            PhaseTask::BusinessPlanClaude => {
                "Draft the full document section by section from the strategy and research."
            }
            PhaseTask::OutlineChatGpt => {
                "Produce a structured outline with headings that match the drafted document."
            }
            PhaseTask::ChartsGemini => {
                "Propose charts and tables with the data each one should visualise."
            }
            PhaseTask::VerifyPerplexity => {
                "Verify numbers, dates and claims in the draft against current sources."
            }
            PhaseTask::FinalReviewClaude => {
                "Review the draft for consistency, gaps and persuasiveness; list concrete fixes."
            }
            PhaseTask::PolishClaude => {
                "Polish the final document: tone, flow and formatting, keeping all facts intact."
            }
        }
    }
}

impl std::fmt::Display for PhaseTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        PhaseTask::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| s.to_string())
    }
}
