//! File-backed pipeline session storage.
//!
//! One JSON document per run at `<root>/<session_id>/pipeline_state.json`,
//! replaced atomically on every save. The document mirrors
//! [`PipelineSession`] exactly, so a load yields an equal session.

use crate::fs::atomic_write;
use aigenflow_application::{PipelineStore, SessionSummary, StoreError};
use aigenflow_domain::PipelineSession;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the persisted session document
pub const STATE_FILE: &str = "pipeline_state.json";

pub struct JsonPipelineStore {
    root: PathBuf,
}

impl JsonPipelineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id).join(STATE_FILE)
    }

    fn read(path: &Path) -> Result<Option<PipelineSession>, StoreError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
    }

    fn list_blocking(root: &Path) -> Result<Vec<SessionSummary>, StoreError> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join(STATE_FILE);
            if !path.is_file() {
                continue;
            }
            match Self::read(&path) {
                Ok(Some(session)) => summaries.push(SessionSummary::from(&session)),
                Ok(None) => {}
                // One unreadable run should not hide the others
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session"),
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[async_trait]
impl PipelineStore for JsonPipelineStore {
    async fn save(&self, session: &PipelineSession) -> Result<(), StoreError> {
        let path = self.path_for(session.id());
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&target, &json, None))
            .await
            .map_err(|e| StoreError::Io(format!("blocking task failed: {e}")))?
            .map_err(|e| StoreError::Io(e.to_string()))?;
        debug!(session_id = %session.id(), path = %path.display(), "Pipeline state written");
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<PipelineSession>, StoreError> {
        // Ids are directory names; reject anything that could escape the root
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Ok(None);
        }
        let path = self.path_for(id);
        tokio::task::spawn_blocking(move || Self::read(&path))
            .await
            .map_err(|e| StoreError::Io(format!("blocking task failed: {e}")))?
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::list_blocking(&root))
            .await
            .map_err(|e| StoreError::Io(format!("blocking task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigenflow_domain::{
        AgentResponse, PhaseResult, PhaseStatus, PhaseTask, PipelineConfig, PipelineState,
        ProviderKind, RouteStep,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn session_with_result(id: &str) -> PipelineSession {
        let mut session =
            PipelineSession::new(id, PipelineConfig::new("Smart farming sensor network"));
        session.transition_to(PipelineState::Phase(1)).unwrap();
        let now = Utc::now();
        let mut artifacts = BTreeMap::new();
        artifacts.insert("notes".to_string(), "한국어 메모".to_string());
        session
            .append_result(PhaseResult {
                phase_number: 1,
                name: "Framing".to_string(),
                status: PhaseStatus::Completed,
                ai_responses: vec![
                    AgentResponse::failure(ProviderKind::ChatGpt, PhaseTask::BrainstormChatGpt, "timeout", 30_000),
                    AgentResponse::success(ProviderKind::Gemini, PhaseTask::BrainstormChatGpt, "ideas", 120, 2_345)
                        .at(RouteStep::Fallback, 2),
                    AgentResponse::success(ProviderKind::Claude, PhaseTask::ValidateClaude, "ok", 80, 1_200),
                ],
                summary: "Framing done".to_string(),
                artifacts,
                started_at: now,
                completed_at: now,
            })
            .unwrap();
        session.transition_to(PipelineState::Phase(2)).unwrap();
        session
    }

    #[tokio::test]
    async fn test_save_load_roundtrip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPipelineStore::new(dir.path());
        let session = session_with_result("run-1");

        store.save(&session).await.unwrap();
        let loaded = store.load("run-1").await.unwrap().unwrap();
        assert_eq!(loaded, session);

        // Re-serializing the loaded session reproduces the file byte for byte
        let on_disk = std::fs::read(store.path_for("run-1")).unwrap();
        assert_eq!(serde_json::to_vec_pretty(&loaded).unwrap(), on_disk);
    }

    #[tokio::test]
    async fn test_state_is_human_readable() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPipelineStore::new(dir.path());
        store.save(&session_with_result("run-2")).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path_for("run-2")).unwrap()).unwrap();
        assert_eq!(value["state"], "phase_2");
        assert_eq!(value["results"][0]["status"], "completed");
        assert_eq!(value["results"][0]["ai_responses"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_load_unknown_or_unsafe_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPipelineStore::new(dir.path());
        assert_eq!(store.load("nope").await.unwrap(), None);
        assert_eq!(store.load("../etc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupted_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPipelineStore::new(dir.path());
        let path = store.path_for("bad");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{").unwrap();

        assert!(matches!(
            store.load("bad").await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPipelineStore::new(dir.path());

        store.save(&session_with_result("older")).await.unwrap();
        let mut newer = session_with_result("newer");
        newer.transition_to(PipelineState::Phase(3)).unwrap();
        store.save(&newer).await.unwrap();
        std::fs::create_dir_all(dir.path().join("not-a-run")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let list = store.list().await.unwrap();
        let ids: Vec<_> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert_eq!(list[1].completed_phases, 1);
        assert_eq!(list[1].phase_count, 5);
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPipelineStore::new(dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
