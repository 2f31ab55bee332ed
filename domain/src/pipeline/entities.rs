//! Pipeline session aggregate

use crate::core::error::PipelineError;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::phase::PhaseKind;
use crate::pipeline::result::{PhaseFailure, PhaseResult, PhaseStatus};
use crate::pipeline::state::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pipeline run; the unit of persistence and resume (Aggregate Root)
///
/// State changes only through [`transition_to`](Self::transition_to),
/// [`fail`](Self::fail) and [`reopen_at`](Self::reopen_at). Results are
/// append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSession {
    id: String,
    config: PipelineConfig,
    state: PipelineState,
    results: Vec<PhaseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_failure: Option<PhaseFailure>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PipelineSession {
    pub fn new(id: impl Into<String>, config: PipelineConfig) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            config,
            state: PipelineState::Idle,
            results: Vec::new(),
            last_failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// New session with a random id
    pub fn create(config: PipelineConfig) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), config)
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn results(&self) -> &[PhaseResult] {
        &self.results
    }

    pub fn last_failure(&self) -> Option<&PhaseFailure> {
        self.last_failure.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn phase_count(&self) -> u8 {
        self.config.phase_count()
    }

    /// Phase kind for the current `Phase(k)` state
    pub fn current_phase(&self) -> Option<PhaseKind> {
        self.state
            .phase_number()
            .and_then(|k| self.config.phase_at(k))
    }

    // ==================== State machine ====================

    /// Move to `next`, or return `InvalidTransition` leaving state unchanged.
    pub fn transition_to(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next, self.phase_count()) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.touch();
        Ok(())
    }

    /// Transition to `Failed`, recording which phase caused it.
    pub fn fail(&mut self, failure: PhaseFailure) -> Result<(), PipelineError> {
        self.transition_to(PipelineState::Failed)?;
        self.last_failure = Some(failure);
        Ok(())
    }

    /// Append a completed phase result.
    ///
    /// Only completed results are accepted, and only for the phase currently
    /// executing.
    pub fn append_result(&mut self, result: PhaseResult) -> Result<(), PipelineError> {
        let current = self.state.phase_number();
        if current != Some(result.phase_number) || result.status != PhaseStatus::Completed {
            return Err(PipelineError::ResultRejected {
                phase: result.phase_number,
                status: result.status,
                state: self.state,
            });
        }
        self.results.push(result);
        self.touch();
        Ok(())
    }

    // ==================== Resume ====================

    /// Latest completed result for phase `number`
    pub fn latest_result(&self, number: u8) -> Option<&PhaseResult> {
        self.results
            .iter()
            .rev()
            .find(|r| r.phase_number == number && r.status == PhaseStatus::Completed)
    }

    /// Smallest phase number with no completed result, or `None` when every
    /// configured phase has one.
    pub fn first_incomplete_phase(&self) -> Option<u8> {
        (1..=self.phase_count()).find(|k| self.latest_result(*k).is_none())
    }

    /// Results the context chain for phase `number` is built from: the
    /// latest completed result of each earlier phase.
    pub fn prior_results(&self, number: u8) -> Vec<&PhaseResult> {
        (1..number).filter_map(|k| self.latest_result(k)).collect()
    }

    /// Re-enter the session at phase `number`.
    ///
    /// This is not a state-machine transition: it is the resume entry point
    /// for a `Failed` or interrupted session. `number` must not exceed the
    /// first incomplete phase. Completed sessions cannot be reopened.
    pub fn reopen_at(&mut self, number: u8) -> Result<(), PipelineError> {
        if self.state == PipelineState::Completed {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: PipelineState::Phase(number),
            });
        }
        let first_incomplete = self
            .first_incomplete_phase()
            .unwrap_or(self.phase_count().saturating_add(1));
        if number == 0 || number > first_incomplete {
            return Err(PipelineError::ResumeTargetInvalid {
                requested: number,
                first_incomplete,
            });
        }
        self.state = if number > self.phase_count() {
            PipelineState::Completed
        } else {
            PipelineState::Phase(number)
        };
        self.last_failure = None;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
