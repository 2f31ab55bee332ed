//! Pipeline store port
//!
//! Durable storage of pipeline sessions, one document per run.

use crate::ports::credential_store::StoreError;
use aigenflow_domain::{PipelineSession, PipelineState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Listing entry for a persisted session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub topic: String,
    pub state: PipelineState,
    pub completed_phases: usize,
    pub phase_count: u8,
    pub updated_at: DateTime<Utc>,
}

impl From<&PipelineSession> for SessionSummary {
    fn from(session: &PipelineSession) -> Self {
        Self {
            id: session.id().to_string(),
            topic: session.config().topic().to_string(),
            state: session.state(),
            completed_phases: (1..=session.phase_count())
                .filter(|k| session.latest_result(*k).is_some())
                .count(),
            phase_count: session.phase_count(),
            updated_at: session.updated_at(),
        }
    }
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Persist the whole session, replacing any previous version atomically
    async fn save(&self, session: &PipelineSession) -> Result<(), StoreError>;

    async fn load(&self, id: &str) -> Result<Option<PipelineSession>, StoreError>;

    /// All persisted sessions, most recently updated first
    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError>;
}
