//! Phase executors.
//!
//! A [`PhaseExecutor`] declares the tasks of one phase and how they run.
//! The shared engine [`run_phase`] dispatches them through the
//! [`AgentRouter`], sequentially or concurrently, and joins the attempt
//! trails positionally so `ai_responses` always follows declaration order.

pub mod framing;
pub mod research;
pub mod review;
pub mod strategy;
pub mod writing;

pub use framing::FramingPhase;
pub use research::ResearchPhase;
pub use review::ReviewPhase;
pub use strategy::StrategyPhase;
pub use writing::WritingPhase;

use crate::gateway::agent_router::{AgentRouter, DispatchError, DispatchRequest};
use aigenflow_domain::{
    AgentResponse, ExecutionMode, PhaseFailure, PhaseKind, PhaseResult, PhaseStatus, PhaseTask,
    PipelineConfig,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a phase needs from the orchestrator
#[derive(Debug, Clone, Copy)]
pub struct PhaseInput<'a> {
    pub session_id: &'a str,
    /// 1-based position of the phase in this run
    pub number: u8,
    pub config: &'a PipelineConfig,
    /// Rendered context chain of prior phases
    pub context: &'a str,
}

/// One concrete pipeline phase
#[async_trait]
pub trait PhaseExecutor: Send + Sync {
    fn kind(&self) -> PhaseKind;

    /// Tasks in declaration order
    fn tasks(&self) -> Vec<PhaseTask> {
        self.kind().tasks().to_vec()
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.kind().execution_mode()
    }

    /// Prompt for `task`. `earlier` holds the served responses of tasks
    /// already completed in this phase (sequential mode only).
    fn build_prompt(&self, input: &PhaseInput<'_>, task: PhaseTask, earlier: &[AgentResponse]) -> String {
        default_prompt(input, task, earlier)
    }

    /// Named outputs extracted from the served responses
    fn artifacts(&self, _served: &[AgentResponse]) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Check a finished result before the orchestrator accepts it
    fn validate(&self, result: &PhaseResult) -> Result<(), String> {
        let missing: Vec<&str> = self
            .tasks()
            .into_iter()
            .filter(|t| result.response_for(*t).is_none())
            .map(|t| t.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("no successful response for: {}", missing.join(", ")))
        }
    }

    async fn execute(
        &self,
        router: &AgentRouter,
        input: PhaseInput<'_>,
    ) -> Result<PhaseResult, PhaseFailure> {
        run_phase(self, router, input).await
    }
}

/// The five phases in pipeline order
pub fn default_phases() -> Vec<Arc<dyn PhaseExecutor>> {
    vec![
        Arc::new(FramingPhase),
        Arc::new(ResearchPhase),
        Arc::new(StrategyPhase),
        Arc::new(WritingPhase),
        Arc::new(ReviewPhase),
    ]
}

/// Dispatch every task of `executor` and assemble the phase result.
pub async fn run_phase<E: PhaseExecutor + ?Sized>(
    executor: &E,
    router: &AgentRouter,
    input: PhaseInput<'_>,
) -> Result<PhaseResult, PhaseFailure> {
    let kind = executor.kind();
    let tasks = executor.tasks();
    let started_at = Utc::now();
    info!(phase = input.number, name = %kind, tasks = tasks.len(), mode = ?executor.execution_mode(), "Executing phase");

    if tasks.is_empty() {
        return Ok(PhaseResult {
            phase_number: input.number,
            name: kind.display_name().to_string(),
            status: PhaseStatus::Skipped,
            ai_responses: Vec::new(),
            summary: String::new(),
            artifacts: BTreeMap::new(),
            started_at,
            completed_at: Utc::now(),
        });
    }

    let (trail, served, error) = match executor.execution_mode() {
        ExecutionMode::Sequential => run_sequential(executor, router, &input, &tasks).await,
        ExecutionMode::Concurrent => run_concurrent(executor, router, &input, &tasks).await,
    };

    if let Some(error) = error {
        warn!(phase = input.number, name = %kind, error = %error, "Phase failed");
        return Err(PhaseFailure {
            phase_number: input.number,
            name: kind.display_name().to_string(),
            error,
            ai_responses: trail,
            failed_at: Utc::now(),
        });
    }

    let result = PhaseResult {
        phase_number: input.number,
        name: kind.display_name().to_string(),
        status: PhaseStatus::Completed,
        summary: summarize(kind, &served),
        artifacts: executor.artifacts(&served),
        ai_responses: trail,
        started_at,
        completed_at: Utc::now(),
    };

    if let Err(reason) = executor.validate(&result) {
        warn!(phase = input.number, name = %kind, reason = %reason, "Phase result rejected");
        return Err(PhaseFailure {
            phase_number: input.number,
            name: kind.display_name().to_string(),
            error: format!("result validation failed: {reason}"),
            ai_responses: result.ai_responses,
            failed_at: Utc::now(),
        });
    }

    debug!(phase = input.number, responses = result.ai_responses.len(), "Phase result accepted");
    Ok(result)
}

type Outcome = (Vec<AgentResponse>, Vec<AgentResponse>, Option<String>);

/// Run tasks one after another; the first exhausted task stops the phase.
async fn run_sequential<E: PhaseExecutor + ?Sized>(
    executor: &E,
    router: &AgentRouter,
    input: &PhaseInput<'_>,
    tasks: &[PhaseTask],
) -> Outcome {
    let mut trail = Vec::new();
    let mut served: Vec<AgentResponse> = Vec::new();
    for task in tasks {
        let prompt = executor.build_prompt(input, *task, &served);
        let request = DispatchRequest {
            session_id: input.session_id,
            phase: input.number,
            task: *task,
            prompt: &prompt,
            context: input.context,
        };
        match router.dispatch(&request).await {
            Ok(dispatch) => {
                if let Some(response) = dispatch.response() {
                    served.push(response.clone());
                }
                trail.extend(dispatch.attempts);
            }
            Err(DispatchError {
                attempts,
                last_error,
                task,
            }) => {
                trail.extend(attempts);
                return (trail, served, Some(format!("task {task} exhausted all providers: {last_error}")));
            }
        }
    }
    (trail, served, None)
}

/// Run all tasks at once and join the trails in declaration order.
async fn run_concurrent<E: PhaseExecutor + ?Sized>(
    executor: &E,
    router: &AgentRouter,
    input: &PhaseInput<'_>,
    tasks: &[PhaseTask],
) -> Outcome {
    let prompts: Vec<String> = tasks
        .iter()
        .map(|task| executor.build_prompt(input, *task, &[]))
        .collect();

    let dispatches = tasks.iter().zip(&prompts).map(|(task, prompt)| async move {
        let request = DispatchRequest {
            session_id: input.session_id,
            phase: input.number,
            task: *task,
            prompt,
            context: input.context,
        };
        router.dispatch(&request).await
    });
    let outcomes = join_all(dispatches).await;

    let mut trail = Vec::new();
    let mut served = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(dispatch) => {
                if let Some(response) = dispatch.response() {
                    served.push(response.clone());
                }
                trail.extend(dispatch.attempts);
            }
            Err(e) => {
                errors.push(format!("task {} exhausted all providers: {}", e.task, e.last_error));
                trail.extend(e.attempts);
            }
        }
    }
    let error = (!errors.is_empty()).then(|| errors.join("; "));
    (trail, served, error)
}

/// Prompt shared by every phase; concrete phases prepend their own framing.
pub fn default_prompt(input: &PhaseInput<'_>, task: PhaseTask, earlier: &[AgentResponse]) -> String {
    let config = input.config;
    let mut prompt = format!(
        "{}\n\nTopic: {}\nDocument type: {} (template: {})\nRespond in language: {}\n",
        task.instruction(),
        config.topic(),
        config.doc_type(),
        config.template(),
        config.language(),
    );
    for response in earlier {
        prompt.push_str(&format!(
            "\n### Output of {} ({})\n{}\n",
            response.task, response.provider, response.content
        ));
    }
    prompt
}

fn summarize(kind: PhaseKind, served: &[AgentResponse]) -> String {
    let parts: Vec<String> = served
        .iter()
        .map(|r| format!("{} via {}", r.task, r.provider))
        .collect();
    format!(
        "{} completed {} task(s): {}",
        kind.display_name(),
        served.len(),
        parts.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RecoveryConfig, RetryPolicy};
    use crate::gateway::session_manager::SessionManager;
    use crate::testing::{InMemoryCredentialStore, MockProvider, fleet_adapters, healthy_fleet};
    use aigenflow_domain::{ProviderKind, RoutingTable};
    use std::collections::HashMap;
    use std::time::Duration;

    fn router(fleet: &HashMap<ProviderKind, Arc<MockProvider>>) -> AgentRouter {
        let sessions = SessionManager::new(
            fleet_adapters(fleet),
            InMemoryCredentialStore::new(),
            RecoveryConfig::default(),
        );
        AgentRouter::new(Arc::new(sessions), RoutingTable::default(), RetryPolicy::immediate(2))
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new("AI-powered logistics platform")
    }

    fn input<'a>(config: &'a PipelineConfig, number: u8) -> PhaseInput<'a> {
        PhaseInput {
            session_id: "s-1",
            number,
            config,
            context: "",
        }
    }

    #[tokio::test]
    async fn test_concurrent_phase_keeps_declaration_order() {
        let fleet = healthy_fleet();
        // First declared task finishes last
        fleet[&ProviderKind::Gemini].set_send_delay(Duration::from_millis(60));
        let router = router(&fleet);
        let config = config();

        let result = ResearchPhase.execute(&router, input(&config, 2)).await.unwrap();
        let tasks: Vec<_> = result.ai_responses.iter().map(|r| r.task).collect();
        assert_eq!(
            tasks,
            vec![PhaseTask::DeepSearchGemini, PhaseTask::FactCheckPerplexity]
        );
        assert_eq!(result.status, PhaseStatus::Completed);
    }

    #[tokio::test]
    async fn test_sequential_phase_feeds_earlier_output() {
        let fleet = healthy_fleet();
        let router = router(&fleet);
        let config = config();

        let result = FramingPhase.execute(&router, input(&config, 1)).await.unwrap();
        assert_eq!(result.ai_responses.len(), 2);
        let claude_prompt = fleet[&ProviderKind::Claude].prompts.lock().unwrap()[0].clone();
        assert!(claude_prompt.contains("Output of brainstorm_chatgpt (chatgpt)"));
        assert!(claude_prompt.contains("chatgpt response"));
        assert!(result.summary.contains("brainstorm_chatgpt via chatgpt"));
    }

    #[tokio::test]
    async fn test_sequential_failure_stops_phase() {
        let fleet: HashMap<_, _> = ProviderKind::ALL
            .into_iter()
            .map(|k| (k, MockProvider::broken(k)))
            .collect();
        let router = router(&fleet);
        let config = config();

        let failure = StrategyPhase.execute(&router, input(&config, 3)).await.unwrap_err();
        assert_eq!(failure.phase_number, 3);
        assert!(failure.error.contains("swot_chatgpt"));
        // The second task never ran
        assert!(failure
            .ai_responses
            .iter()
            .all(|r| r.task == PhaseTask::SwotChatGpt));
    }

    #[tokio::test]
    async fn test_concurrent_failure_keeps_all_trails() {
        let fleet: HashMap<_, _> = ProviderKind::ALL
            .into_iter()
            .map(|k| (k, MockProvider::broken(k)))
            .collect();
        let router = router(&fleet);
        let config = config();

        let failure = ReviewPhase.execute(&router, input(&config, 5)).await.unwrap_err();
        assert!(failure.error.contains("verify_perplexity"));
        assert!(failure.error.contains("polish_claude"));

        // Trails are grouped per task in declaration order
        let declared = ReviewPhase.tasks();
        let positions: Vec<usize> = failure
            .ai_responses
            .iter()
            .map(|r| declared.iter().position(|t| *t == r.task).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));
        assert!(positions.contains(&0) && positions.contains(&2));
    }

    #[tokio::test]
    async fn test_validation_rejects_missing_task() {
        let now = Utc::now();
        let result = PhaseResult {
            phase_number: 1,
            name: "Framing".to_string(),
            status: PhaseStatus::Completed,
            ai_responses: vec![AgentResponse::success(
                ProviderKind::ChatGpt,
                PhaseTask::BrainstormChatGpt,
                "x",
                1,
                1,
            )],
            summary: String::new(),
            artifacts: BTreeMap::new(),
            started_at: now,
            completed_at: now,
        };
        let err = FramingPhase.validate(&result).unwrap_err();
        assert!(err.contains("validate_claude"));
    }

    #[test]
    fn test_default_phases_in_order() {
        let kinds: Vec<_> = default_phases().iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, PhaseKind::ALL.to_vec());
    }
}
