//! Task dispatch with retry, fallback and safety net.
//!
//! For one task the router tries, in order:
//!
//! 1. the primary provider, up to `RetryPolicy::attempts` times with
//!    exponential backoff
//! 2. each fallback provider once
//! 3. the safety-net provider once, with a prompt asking it to proceed
//!    despite the missing responses
//!
//! Every call becomes an [`AgentResponse`] in the returned trail, so the
//! bound is `attempts + fallbacks + 1` responses per dispatch.

use crate::config::RetryPolicy;
use crate::events::EventBus;
use crate::gateway::session_manager::SessionManager;
use crate::ports::provider_adapter::ProviderError;
use aigenflow_domain::{
    AgentResponse, PhaseTask, PipelineEvent, ProviderKind, RouteStep, RoutingTable,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Prefix for the safety-net prompt
const SAFETY_NET_PREFIX: &str = "Earlier providers could not complete this task, so some \
prior responses may be missing. Proceed with the information available and produce the \
best complete answer you can.";

/// One task to dispatch
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub session_id: &'a str,
    pub phase: u8,
    pub task: PhaseTask,
    pub prompt: &'a str,
    pub context: &'a str,
}

/// Successful dispatch: the full attempt trail, ending with the response
/// that served the task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub attempts: Vec<AgentResponse>,
}

impl Dispatch {
    /// The response that served the task
    pub fn response(&self) -> Option<&AgentResponse> {
        self.attempts.last().filter(|r| r.success)
    }
}

/// Every option for a task was exhausted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Task {task} failed after {} attempts: {last_error}", attempts.len())]
pub struct DispatchError {
    pub task: PhaseTask,
    pub attempts: Vec<AgentResponse>,
    pub last_error: String,
}

impl DispatchError {
    /// Provider of the final attempt
    pub fn last_provider(&self) -> Option<ProviderKind> {
        self.attempts.last().map(|r| r.provider)
    }
}

/// How an attempt failed
struct AttemptFailure {
    response: AgentResponse,
    /// Whether another call to the same provider could succeed
    retryable: bool,
}

pub struct AgentRouter {
    sessions: Arc<SessionManager>,
    routing: RoutingTable,
    retry: RetryPolicy,
    events: EventBus,
}

impl AgentRouter {
    pub fn new(sessions: Arc<SessionManager>, routing: RoutingTable, retry: RetryPolicy) -> Self {
        Self {
            sessions,
            routing,
            retry,
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Obtain a successful response for `request.task`.
    pub async fn dispatch(&self, request: &DispatchRequest<'_>) -> Result<Dispatch, DispatchError> {
        let route = self.routing.route(request.task);
        let mut trail: Vec<AgentResponse> = Vec::new();
        let mut last_error = String::from("no provider attempted");

        // Primary with retries
        if self.sessions.is_failed(route.primary) {
            debug!(provider = %route.primary, task = %request.task, "Primary disabled for this run, skipping");
            last_error = format!("{} is disabled for this run", route.primary);
        } else {
            for retry in 0..self.retry.attempts.max(1) {
                if retry > 0 {
                    let delay = self.retry.delay_for(retry);
                    debug!(provider = %route.primary, retry, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                    tokio::time::sleep(delay).await;
                }
                let attempt = trail.len() as u32 + 1;
                match self
                    .attempt(request, route.primary, RouteStep::Primary, attempt, request.prompt)
                    .await
                {
                    Ok(response) => {
                        trail.push(response);
                        return Ok(Dispatch { attempts: trail });
                    }
                    Err(failure) => {
                        last_error = failure.response.error.clone().unwrap_or_default();
                        trail.push(failure.response);
                        if !failure.retryable {
                            break;
                        }
                    }
                }
            }
        }

        // Fallbacks, one attempt each
        for provider in route.fallbacks {
            if !self.sessions.is_available(provider) {
                debug!(provider = %provider, task = %request.task, "Fallback unavailable, skipping");
                continue;
            }
            let attempt = trail.len() as u32 + 1;
            info!(provider = %provider, task = %request.task, "Falling back");
            match self
                .attempt(request, provider, RouteStep::Fallback, attempt, request.prompt)
                .await
            {
                Ok(response) => {
                    trail.push(response);
                    return Ok(Dispatch { attempts: trail });
                }
                Err(failure) => {
                    last_error = failure.response.error.clone().unwrap_or_default();
                    trail.push(failure.response);
                }
            }
        }

        // Safety net, always attempted
        let safety_net = self.routing.safety_net();
        warn!(provider = %safety_net, task = %request.task, "Escalating to safety net");
        let prompt = format!("{SAFETY_NET_PREFIX}\n\n{}", request.prompt);
        let attempt = trail.len() as u32 + 1;
        match self
            .attempt(request, safety_net, RouteStep::SafetyNet, attempt, &prompt)
            .await
        {
            Ok(response) => {
                trail.push(response);
                Ok(Dispatch { attempts: trail })
            }
            Err(failure) => {
                last_error = failure.response.error.clone().unwrap_or(last_error);
                trail.push(failure.response);
                warn!(task = %request.task, attempts = trail.len(), "All providers exhausted");
                Err(DispatchError {
                    task: request.task,
                    attempts: trail,
                    last_error,
                })
            }
        }
    }

    /// One provider call, recorded whatever the outcome.
    async fn attempt(
        &self,
        request: &DispatchRequest<'_>,
        provider: ProviderKind,
        step: RouteStep,
        attempt: u32,
        prompt: &str,
    ) -> Result<AgentResponse, AttemptFailure> {
        self.events.publish(PipelineEvent::AgentCalled {
            session_id: request.session_id.to_string(),
            phase: request.phase,
            task: request.task,
            provider,
            step,
            attempt,
            timestamp: Utc::now(),
        });
        let started = Instant::now();
        let outcome = self.call(provider, prompt, request.context).await;
        let elapsed = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok((content, tokens, latency_ms)) => Ok(AgentResponse::success(
                provider,
                request.task,
                content,
                tokens,
                latency_ms.unwrap_or(elapsed),
            )
            .at(step, attempt)),
            Err((error, retryable)) => {
                warn!(provider = %provider, task = %request.task, attempt, error = %error, "Attempt failed");
                Err(AttemptFailure {
                    response: AgentResponse::failure(provider, request.task, error, elapsed)
                        .at(step, attempt),
                    retryable,
                })
            }
        };

        let response = match &result {
            Ok(r) => r,
            Err(f) => &f.response,
        };
        self.events.publish(PipelineEvent::AgentResponded {
            session_id: request.session_id.to_string(),
            phase: request.phase,
            task: request.task,
            provider,
            success: response.success,
            latency_ms: response.latency_ms,
            error: response.error.clone(),
            timestamp: Utc::now(),
        });
        result
    }

    /// Returns `(content, tokens, reported latency)` or `(error, retryable)`.
    async fn call(
        &self,
        provider: ProviderKind,
        prompt: &str,
        context: &str,
    ) -> Result<(String, u32, Option<u64>), (String, bool)> {
        if let Err(e) = self.sessions.ensure_valid(provider).await {
            return Err((e.to_string(), false));
        }
        let adapter = self
            .sessions
            .adapter(provider)
            .ok_or_else(|| (format!("No adapter registered for {provider}"), false))?;

        match adapter.send(prompt, context).await {
            Ok(reply) if reply.content.trim().is_empty() => Err((
                ProviderError::InvalidResponse("empty response".to_string()).to_string(),
                true,
            )),
            Ok(reply) => {
                let latency = (!reply.latency.is_zero()).then(|| reply.latency.as_millis() as u64);
                Ok((reply.content, reply.tokens_used, latency))
            }
            Err(e) => {
                if e.is_session_invalid() {
                    self.sessions.report_invalid(provider);
                }
                Err((e.to_string(), true))
            }
        }
    }
}
