//! Application layer for aigenflow
//!
//! This crate contains the resilient gateway (session management and task
//! routing), the phase executors, the orchestrator use case and the ports
//! implemented by the infrastructure layer. It depends only on the domain layer.

pub mod config;
pub mod events;
pub mod gateway;
pub mod phases;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{PipelineSettings, RecoveryConfig, RetryPolicy};
pub use events::EventBus;
pub use gateway::{
    agent_router::{AgentRouter, Dispatch, DispatchError, DispatchRequest},
    session_manager::{ProviderStatus, SessionError, SessionManager},
};
pub use phases::{PhaseExecutor, PhaseInput, default_phases};
pub use ports::{
    credential_store::{CredentialStore, StoreError},
    pipeline_store::{PipelineStore, SessionSummary},
    provider_adapter::{ProviderAdapter, ProviderError, ProviderReply},
    summarizer::{ContextSummarizer, NoSummarizer, SummarizeError},
};
pub use use_cases::orchestrator::PipelineOrchestrator;
