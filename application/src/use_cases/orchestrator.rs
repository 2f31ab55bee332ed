//! Pipeline orchestrator use case
//!
//! Drives a [`PipelineSession`] through its phases with a durable checkpoint
//! after every state change:
//!
//! ```text
//! run(config)   validate -> Idle (saved) -> Phase 1 (saved) -> ... -> Completed (saved)
//! resume(id)    load -> reopen at first incomplete phase (saved) -> ...
//! ```
//!
//! A phase either appends exactly one completed [`PhaseResult`] and advances,
//! or moves the session to `Failed` keeping every earlier result.

use crate::events::EventBus;
use crate::gateway::agent_router::AgentRouter;
use crate::phases::{PhaseExecutor, PhaseInput};
use crate::ports::pipeline_store::{PipelineStore, SessionSummary};
use crate::ports::summarizer::{ContextSummarizer, NoSummarizer};
use aigenflow_domain::{
    ConfigError, ContextChain, ContextSettings, PhaseFailure, PhaseKind, PhaseResult,
    PipelineConfig, PipelineError, PipelineEvent, PipelineSession, PipelineState,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reason recorded when the operator aborts a phase
const ABORT_REASON: &str = "aborted by operator";

pub struct PipelineOrchestrator {
    router: Arc<AgentRouter>,
    store: Arc<dyn PipelineStore>,
    summarizer: Arc<dyn ContextSummarizer>,
    executors: HashMap<PhaseKind, Arc<dyn PhaseExecutor>>,
    context: ContextSettings,
    events: EventBus,
    cancel: CancellationToken,
}

impl PipelineOrchestrator {
    pub fn new(
        router: Arc<AgentRouter>,
        store: Arc<dyn PipelineStore>,
        executors: Vec<Arc<dyn PhaseExecutor>>,
    ) -> Self {
        Self {
            router,
            store,
            summarizer: Arc::new(NoSummarizer),
            executors: executors.into_iter().map(|e| (e.kind(), e)).collect(),
            context: ContextSettings::default(),
            events: EventBus::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn ContextSummarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_context_settings(mut self, settings: ContextSettings) -> Self {
        self.context = settings;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Token whose cancellation aborts the phase in progress
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Start a new run.
    ///
    /// An invalid configuration fails before anything is persisted.
    pub async fn run(&self, config: PipelineConfig) -> Result<PipelineSession, PipelineError> {
        config.validate()?;
        for phase in config.phases() {
            if !self.executors.contains_key(phase) {
                return Err(ConfigError::NoExecutor(*phase).into());
            }
        }

        let mut session = PipelineSession::create(config);
        info!(session_id = %session.id(), topic = %session.config().topic(), phases = session.phase_count(), "Starting pipeline");
        self.events.publish(PipelineEvent::PipelineStarted {
            session_id: session.id().to_string(),
            topic: session.config().topic().to_string(),
            phase_count: session.phase_count(),
            timestamp: Utc::now(),
        });
        self.persist(&session).await?;

        session.transition_to(PipelineState::Phase(1))?;
        self.persist(&session).await?;

        self.drive(session).await
    }

    /// Continue a persisted run.
    ///
    /// Without `from_phase` the run restarts at the first phase that has no
    /// completed result. A completed session is returned unchanged.
    pub async fn resume(
        &self,
        session_id: &str,
        from_phase: Option<u8>,
    ) -> Result<PipelineSession, PipelineError> {
        let mut session = self.load(session_id).await?;
        if session.state() == PipelineState::Completed {
            info!(session_id, "Session already completed, nothing to resume");
            return Ok(session);
        }

        let target = match from_phase {
            Some(phase) => phase,
            None => session
                .first_incomplete_phase()
                .unwrap_or(session.phase_count().saturating_add(1)),
        };
        session.reopen_at(target)?;
        info!(session_id, from_phase = target, state = %session.state(), "Resuming pipeline");
        self.events.publish(PipelineEvent::PipelineResumed {
            session_id: session.id().to_string(),
            from_phase: target,
            timestamp: Utc::now(),
        });
        self.persist(&session).await?;

        self.drive(session).await
    }

    /// Persisted snapshot of a session
    pub async fn status(&self, session_id: &str) -> Result<PipelineSession, PipelineError> {
        self.load(session_id).await
    }

    pub async fn list(&self) -> Result<Vec<SessionSummary>, PipelineError> {
        self.store
            .list()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))
    }

    /// Run phases until the session completes or a phase fails.
    async fn drive(&self, mut session: PipelineSession) -> Result<PipelineSession, PipelineError> {
        while let PipelineState::Phase(number) = session.state() {
            self.execute_phase(&mut session, number).await?;
        }

        if session.state() == PipelineState::Completed {
            info!(session_id = %session.id(), "Pipeline completed");
            self.events.publish(PipelineEvent::PipelineCompleted {
                session_id: session.id().to_string(),
                phase_count: session.phase_count(),
                timestamp: Utc::now(),
            });
        }
        Ok(session)
    }

    /// Execute phase `number` of `session` and checkpoint the outcome.
    pub async fn execute_phase(
        &self,
        session: &mut PipelineSession,
        number: u8,
    ) -> Result<PhaseResult, PipelineError> {
        let kind = session
            .config()
            .phase_at(number)
            .ok_or(ConfigError::PhaseNotConfigured(number))?;
        let executor = self
            .executors
            .get(&kind)
            .cloned()
            .ok_or(ConfigError::NoExecutor(kind))?;

        let providers = executor
            .tasks()
            .into_iter()
            .map(|task| self.router.routing().route(task).primary)
            .collect();
        self.events.publish(PipelineEvent::PhaseStarted {
            session_id: session.id().to_string(),
            phase: number,
            name: kind.display_name().to_string(),
            providers,
            timestamp: Utc::now(),
        });

        let context = self.build_context(session, number).await;
        let input = PhaseInput {
            session_id: session.id(),
            number,
            config: session.config(),
            context: context.as_str(),
        };

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = executor.execute(&self.router, input) => Some(outcome),
        };

        match outcome {
            Some(Ok(result)) => {
                self.complete_phase(session, result.clone()).await?;
                Ok(result)
            }
            Some(Err(failure)) => {
                let reason = failure.error.clone();
                self.fail_phase(session, failure).await?;
                Err(PipelineError::PhaseFailed {
                    phase: number,
                    name: kind.display_name().to_string(),
                    session_id: session.id().to_string(),
                    reason,
                })
            }
            None => {
                warn!(session_id = %session.id(), phase = number, "Phase aborted by operator");
                let failure = PhaseFailure {
                    phase_number: number,
                    name: kind.display_name().to_string(),
                    error: ABORT_REASON.to_string(),
                    ai_responses: Vec::new(),
                    failed_at: Utc::now(),
                };
                self.fail_phase(session, failure).await?;
                Err(PipelineError::Cancelled {
                    phase: number,
                    session_id: session.id().to_string(),
                })
            }
        }
    }

    async fn complete_phase(
        &self,
        session: &mut PipelineSession,
        result: PhaseResult,
    ) -> Result<(), PipelineError> {
        let number = result.phase_number;
        let providers = result.successful_responses().map(|r| r.provider).collect();
        let response_count = result.ai_responses.len();
        let name = result.name.clone();

        session.append_result(result)?;
        let next = if number >= session.phase_count() {
            PipelineState::Completed
        } else {
            PipelineState::Phase(number + 1)
        };
        session.transition_to(next)?;
        self.persist(session).await?;

        info!(session_id = %session.id(), phase = number, responses = response_count, "Phase completed");
        self.events.publish(PipelineEvent::PhaseCompleted {
            session_id: session.id().to_string(),
            phase: number,
            name,
            providers,
            response_count,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn fail_phase(
        &self,
        session: &mut PipelineSession,
        failure: PhaseFailure,
    ) -> Result<(), PipelineError> {
        let number = failure.phase_number;
        let name = failure.name.clone();
        let error = failure.error.clone();
        let provider = failure.ai_responses.last().map(|r| r.provider);

        session.fail(failure)?;
        self.persist(session).await?;

        error!(session_id = %session.id(), phase = number, error = %error, "Phase failed, session can be resumed");
        self.events.publish(PipelineEvent::PhaseFailed {
            session_id: session.id().to_string(),
            phase: number,
            name,
            provider,
            error: error.clone(),
            timestamp: Utc::now(),
        });
        self.events.publish(PipelineEvent::PipelineFailed {
            session_id: session.id().to_string(),
            phase: number,
            provider,
            error,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Render the context chain for phase `number`, reducing it once it
    /// crosses the configured threshold.
    async fn build_context(&self, session: &PipelineSession, number: u8) -> ContextChain {
        let chain = ContextChain::for_phase(session, number, &self.context);
        if !self.context.needs_summary(chain.len()) {
            return chain;
        }

        debug!(phase = number, bytes = chain.len(), target = self.context.target_bytes(chain.len()), "Summarizing context");
        match self
            .summarizer
            .summarize(chain.as_str(), self.context.target_ratio())
            .await
        {
            Ok(reduced) => ContextChain::from_text(reduced, chain.phases_included()),
            Err(e) => {
                warn!(phase = number, error = %e, "Summarizer failed, continuing with full context");
                chain
            }
        }
    }

    async fn load(&self, session_id: &str) -> Result<PipelineSession, PipelineError> {
        self.store
            .load(session_id)
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?
            .ok_or_else(|| PipelineError::SessionNotFound(session_id.to_string()))
    }

    async fn persist(&self, session: &PipelineSession) -> Result<(), PipelineError> {
        self.store
            .save(session)
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        debug!(session_id = %session.id(), state = %session.state(), "Session saved");
        self.events.publish(PipelineEvent::StateSaved {
            session_id: session.id().to_string(),
            state: session.state(),
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
