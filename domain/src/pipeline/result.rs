//! Per-phase results and per-attempt agent responses

use crate::core::provider::ProviderKind;
use crate::pipeline::phase::PhaseTask;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which leg of the fallback chain an attempt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStep {
    Primary,
    Fallback,
    SafetyNet,
}

impl RouteStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStep::Primary => "primary",
            RouteStep::Fallback => "fallback",
            RouteStep::SafetyNet => "safety_net",
        }
    }
}

/// One attempted provider call (Value Object)
///
/// Failed attempts are recorded too, so the audit trail shows every
/// retry and fallback hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub provider: ProviderKind,
    pub task: PhaseTask,
    pub content: String,
    pub tokens_used: u32,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub step: RouteStep,
    /// 1-based attempt number within the dispatch
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    pub fn success(
        provider: ProviderKind,
        task: PhaseTask,
        content: impl Into<String>,
        tokens_used: u32,
        latency_ms: u64,
    ) -> Self {
        Self {
            provider,
            task,
            content: content.into(),
            tokens_used,
            latency_ms,
            success: true,
            error: None,
            step: RouteStep::Primary,
            attempt: 1,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(
        provider: ProviderKind,
        task: PhaseTask,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            provider,
            task,
            content: String::new(),
            tokens_used: 0,
            latency_ms,
            success: false,
            error: Some(error.into()),
            step: RouteStep::Primary,
            attempt: 1,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, step: RouteStep, attempt: u32) -> Self {
        self.step = step;
        self.attempt = attempt;
        self
    }
}

/// Outcome of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    Failed,
    Skipped,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Completed => "completed",
            PhaseStatus::Failed => "failed",
            PhaseStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing one phase (Value Object)
///
/// Immutable once appended to a session. `ai_responses` follows the phase's
/// task declaration order; within a task, attempts are in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase_number: u8,
    pub name: String,
    pub status: PhaseStatus,
    pub ai_responses: Vec<AgentResponse>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl PhaseResult {
    /// Successful responses, one per task that was served
    pub fn successful_responses(&self) -> impl Iterator<Item = &AgentResponse> {
        self.ai_responses.iter().filter(|r| r.success)
    }

    /// Response that finally served `task`, if any
    pub fn response_for(&self, task: PhaseTask) -> Option<&AgentResponse> {
        self.ai_responses
            .iter()
            .rev()
            .find(|r| r.task == task && r.success)
    }

    pub fn total_tokens(&self) -> u64 {
        self.ai_responses.iter().map(|r| r.tokens_used as u64).sum()
    }

    pub fn failed_attempts(&self) -> usize {
        self.ai_responses.iter().filter(|r| !r.success).count()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Record of the phase that moved a session to `Failed`.
///
/// Kept next to the results rather than appended to them, so a failed phase
/// never contributes a result of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFailure {
    pub phase_number: u8,
    pub name: String,
    pub error: String,
    #[serde(default)]
    pub ai_responses: Vec<AgentResponse>,
    pub failed_at: DateTime<Utc>,
}
