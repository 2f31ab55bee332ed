//! Domain error types

use crate::pipeline::phase::PhaseKind;
use crate::pipeline::result::PhaseStatus;
use crate::pipeline::state::PipelineState;
use thiserror::Error;

/// Invalid run configuration.
///
/// Raised before any session is created, so no partial state exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Topic must be at least {min} characters (got {actual})")]
    TopicTooShort { min: usize, actual: usize },

    #[error("Phase list is empty")]
    NoPhases,

    #[error("Phase '{0}' is listed more than once")]
    DuplicatePhase(PhaseKind),

    #[error("Phase '{later}' is listed before '{earlier}'; phases must follow pipeline order")]
    PhaseOrder { earlier: PhaseKind, later: PhaseKind },

    #[error("Output directory must not be empty")]
    EmptyOutputDir,

    #[error("Language code must not be empty")]
    EmptyLanguage,

    #[error("Unknown document type '{0}' (expected bizplan or rd)")]
    UnknownDocumentType(String),

    #[error("Unknown template '{0}' (expected default, startup, strategy or rd)")]
    UnknownTemplate(String),

    #[error("Unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("No executor registered for phase '{0}'")]
    NoExecutor(PhaseKind),

    #[error("Phase {0} is not part of this run")]
    PhaseNotConfigured(u8),
}

/// Orchestrator-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Programming-contract violation; never expected in normal operation
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    /// Programming-contract violation: a result offered for a phase that is
    /// not executing, or one that did not complete
    #[error("Refusing {status} result for phase {phase} while in state {state}")]
    ResultRejected {
        phase: u8,
        status: PhaseStatus,
        state: PipelineState,
    },

    #[error("Phase {phase} ({name}) failed in session {session_id}: {reason}")]
    PhaseFailed {
        phase: u8,
        name: String,
        session_id: String,
        reason: String,
    },

    #[error(
        "Cannot resume at phase {requested}: phase {first_incomplete} is the first incomplete phase"
    )]
    ResumeTargetInvalid { requested: u8, first_incomplete: u8 },

    #[error("No persisted session with id '{0}'")]
    SessionNotFound(String),

    #[error("Phase {phase} aborted by operator in session {session_id}")]
    Cancelled { phase: u8, session_id: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Check if this error represents an operator abort
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }

    /// Session id needed to resume, when the error refers to one
    pub fn session_id(&self) -> Option<&str> {
        match self {
            PipelineError::PhaseFailed { session_id, .. }
            | PipelineError::Cancelled { session_id, .. } => Some(session_id),
            PipelineError::SessionNotFound(id) => Some(id),
            _ => None,
        }
    }
}
