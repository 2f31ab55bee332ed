//! Application-level configuration.
//!
//! - [`RetryPolicy`]: attempts and backoff against a task's primary provider
//! - [`RecoveryConfig`]: timeouts for the session recovery chain
//! - [`PipelineSettings`]: container handed from the config loader to the wiring code

pub mod recovery;
pub mod retry_policy;

pub use recovery::RecoveryConfig;
pub use retry_policy::RetryPolicy;

use aigenflow_domain::{ContextSettings, RoutingTable};

/// Everything the orchestrator, router and session manager are tuned by.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub retry: RetryPolicy,
    pub recovery: RecoveryConfig,
    pub context: ContextSettings,
    pub routing: RoutingTable,
}
