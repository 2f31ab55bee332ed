//! Pipeline state machine
//!
//! ```text
//! Idle -> Phase(1) -> Phase(2) -> ... -> Phase(N) -> Completed
//!   \________\___________\_______________\________-> Failed
//! ```
//!
//! Transitions are strictly forward. `Completed` and `Failed` are terminal;
//! re-entering a failed session goes through
//! [`PipelineSession::reopen_at`](crate::pipeline::entities::PipelineSession::reopen_at),
//! which is not a transition.

use serde::{Deserialize, Serialize};

/// Position of a run in the phase sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PipelineState {
    Idle,
    /// Executing the k-th configured phase (1-based)
    Phase(u8),
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    /// Phase number when the state is `Phase(k)`
    pub fn phase_number(&self) -> Option<u8> {
        match self {
            PipelineState::Phase(k) => Some(*k),
            _ => None,
        }
    }

    /// Whether `self -> next` is in the transition table for a run with
    /// `phase_count` phases.
    pub fn can_transition_to(&self, next: PipelineState, phase_count: u8) -> bool {
        use PipelineState::*;
        match (*self, next) {
            (Completed | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Phase(1)) => phase_count >= 1,
            (Phase(k), Phase(j)) => k >= 1 && j == k + 1 && j <= phase_count,
            (Phase(k), Completed) => k == phase_count,
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Phase(k) => write!(f, "phase_{k}"),
            PipelineState::Completed => f.write_str("completed"),
            PipelineState::Failed => f.write_str("failed"),
        }
    }
}

impl From<PipelineState> for String {
    fn from(state: PipelineState) -> Self {
        state.to_string()
    }
}

impl TryFrom<String> for PipelineState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for PipelineState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(PipelineState::Idle),
            "completed" => Ok(PipelineState::Completed),
            "failed" => Ok(PipelineState::Failed),
            other => other
                .strip_prefix("phase_")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| *n >= 1)
                .map(PipelineState::Phase)
                .ok_or_else(|| format!("invalid pipeline state '{other}'")),
        }
    }
}
