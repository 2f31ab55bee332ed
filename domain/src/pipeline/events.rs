//! Lifecycle events published by the orchestrator and the gateway

use crate::core::provider::ProviderKind;
use crate::pipeline::phase::PhaseTask;
use crate::pipeline::result::RouteStep;
use crate::pipeline::state::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recovery stage that restored a provider session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStage {
    SilentRefresh,
    InteractiveLogin,
}

/// Observable pipeline event.
///
/// Serialized with a `type` tag so each event is one self-describing JSON
/// object (one line in the event log).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    PipelineStarted {
        session_id: String,
        topic: String,
        phase_count: u8,
        timestamp: DateTime<Utc>,
    },
    PipelineResumed {
        session_id: String,
        from_phase: u8,
        timestamp: DateTime<Utc>,
    },
    PhaseStarted {
        session_id: String,
        phase: u8,
        name: String,
        /// Primary providers of the phase's tasks, in declaration order
        providers: Vec<ProviderKind>,
        timestamp: DateTime<Utc>,
    },
    AgentCalled {
        session_id: String,
        phase: u8,
        task: PhaseTask,
        provider: ProviderKind,
        step: RouteStep,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },
    AgentResponded {
        session_id: String,
        phase: u8,
        task: PhaseTask,
        provider: ProviderKind,
        success: bool,
        latency_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
    PhaseCompleted {
        session_id: String,
        phase: u8,
        name: String,
        /// Providers that served each task, in declaration order
        providers: Vec<ProviderKind>,
        response_count: usize,
        timestamp: DateTime<Utc>,
    },
    PhaseFailed {
        session_id: String,
        phase: u8,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<ProviderKind>,
        error: String,
        timestamp: DateTime<Utc>,
    },
    StateSaved {
        session_id: String,
        state: PipelineState,
        timestamp: DateTime<Utc>,
    },
    ProviderRecovered {
        provider: ProviderKind,
        stage: RecoveryStage,
        timestamp: DateTime<Utc>,
    },
    PipelineCompleted {
        session_id: String,
        phase_count: u8,
        timestamp: DateTime<Utc>,
    },
    PipelineFailed {
        session_id: String,
        phase: u8,
        /// Last provider attempted before the phase gave up
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<ProviderKind>,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Wire name of the event (`type` field)
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::PipelineStarted { .. } => "pipeline_started",
            PipelineEvent::PipelineResumed { .. } => "pipeline_resumed",
            PipelineEvent::PhaseStarted { .. } => "phase_started",
            PipelineEvent::AgentCalled { .. } => "agent_called",
            PipelineEvent::AgentResponded { .. } => "agent_responded",
            PipelineEvent::PhaseCompleted { .. } => "phase_completed",
            PipelineEvent::PhaseFailed { .. } => "phase_failed",
            PipelineEvent::StateSaved { .. } => "state_saved",
            PipelineEvent::ProviderRecovered { .. } => "provider_recovered",
            PipelineEvent::PipelineCompleted { .. } => "pipeline_completed",
            PipelineEvent::PipelineFailed { .. } => "pipeline_failed",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PipelineEvent::PipelineStarted { timestamp, .. }
            | PipelineEvent::PipelineResumed { timestamp, .. }
            | PipelineEvent::PhaseStarted { timestamp, .. }
            | PipelineEvent::AgentCalled { timestamp, .. }
            | PipelineEvent::AgentResponded { timestamp, .. }
            | PipelineEvent::PhaseCompleted { timestamp, .. }
            | PipelineEvent::PhaseFailed { timestamp, .. }
            | PipelineEvent::StateSaved { timestamp, .. }
            | PipelineEvent::ProviderRecovered { timestamp, .. }
            | PipelineEvent::PipelineCompleted { timestamp, .. }
            | PipelineEvent::PipelineFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Session the event belongs to; gateway events have none
    pub fn session_id(&self) -> Option<&str> {
        match self {
            PipelineEvent::PipelineStarted { session_id, .. }
            | PipelineEvent::PipelineResumed { session_id, .. }
            | PipelineEvent::PhaseStarted { session_id, .. }
            | PipelineEvent::AgentCalled { session_id, .. }
            | PipelineEvent::AgentResponded { session_id, .. }
            | PipelineEvent::PhaseCompleted { session_id, .. }
            | PipelineEvent::PhaseFailed { session_id, .. }
            | PipelineEvent::StateSaved { session_id, .. }
            | PipelineEvent::PipelineCompleted { session_id, .. }
            | PipelineEvent::PipelineFailed { session_id, .. } => Some(session_id),
            PipelineEvent::ProviderRecovered { .. } => None,
        }
    }

    pub fn phase(&self) -> Option<u8> {
        match self {
            PipelineEvent::PhaseStarted { phase, .. }
            | PipelineEvent::AgentCalled { phase, .. }
            | PipelineEvent::AgentResponded { phase, .. }
            | PipelineEvent::PhaseCompleted { phase, .. }
            | PipelineEvent::PhaseFailed { phase, .. }
            | PipelineEvent::PipelineFailed { phase, .. } => Some(*phase),
            PipelineEvent::PipelineResumed { from_phase, .. } => Some(*from_phase),
            _ => None,
        }
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            PipelineEvent::AgentCalled { provider, .. }
            | PipelineEvent::AgentResponded { provider, .. }
            | PipelineEvent::ProviderRecovered { provider, .. } => Some(*provider),
            PipelineEvent::PhaseFailed { provider, .. }
            | PipelineEvent::PipelineFailed { provider, .. } => *provider,
            _ => None,
        }
    }
}
