//! Domain layer for aigenflow
//!
//! This crate contains the pipeline model, its state machine and the routing
//! policy. It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Pipeline
//!
//! A run walks an ordered list of phases (framing, research, strategy,
//! writing, review). Each phase delegates its tasks to external AI
//! providers and appends one [`PhaseResult`] to the [`PipelineSession`],
//! which is persisted after every state change and is the unit of resume.
//!
//! ## Provider sessions
//!
//! Every provider is reached through a session that can expire. Its
//! lifecycle is tracked by [`SessionState`] and [`SessionMetadata`]; the
//! exported session itself is a redacted [`Credential`].

pub mod context;
pub mod core;
pub mod pipeline;
pub mod routing;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use context::{budget::ContextSettings, chain::ContextChain};
pub use core::{
    error::{ConfigError, PipelineError},
    provider::{ProviderKind, UnknownProvider},
};
pub use pipeline::{
    config::{DocumentType, MIN_TOPIC_CHARS, PipelineConfig, TemplateType},
    entities::PipelineSession,
    events::{PipelineEvent, RecoveryStage},
    phase::{ExecutionMode, PhaseKind, PhaseTask},
    result::{AgentResponse, PhaseFailure, PhaseResult, PhaseStatus, RouteStep},
    state::PipelineState,
};
pub use routing::{RouteEntry, RoutingTable};
pub use session::{credential::Credential, metadata::SessionMetadata, state::SessionState};
