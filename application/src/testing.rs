//! In-crate fakes shared by the unit tests.

use crate::ports::credential_store::{CredentialStore, StoreError};
use crate::ports::pipeline_store::{PipelineStore, SessionSummary};
use crate::ports::provider_adapter::{ProviderAdapter, ProviderError, ProviderReply};
use crate::ports::summarizer::{ContextSummarizer, SummarizeError};
use aigenflow_domain::{
    Credential, PipelineSession, PipelineState, ProviderKind, SessionMetadata,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// -- Provider ----------------------------------------------------------------

/// Scripted provider.
///
/// `send` pops queued replies first; once the queue is empty it answers
/// `"<kind> response"` unless `always_fail` is set.
pub(crate) struct MockProvider {
    kind: ProviderKind,
    replies: Mutex<VecDeque<Result<ProviderReply, ProviderError>>>,
    always_fail: AtomicBool,
    session_valid: AtomicBool,
    refresh_ok: AtomicBool,
    login_ok: AtomicBool,
    send_delay: Mutex<Duration>,
    refresh_delay: Mutex<Duration>,
    login_delay: Mutex<Duration>,
    pub send_calls: AtomicUsize,
    pub check_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub load_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn healthy(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            replies: Mutex::new(VecDeque::new()),
            always_fail: AtomicBool::new(false),
            session_valid: AtomicBool::new(true),
            refresh_ok: AtomicBool::new(true),
            login_ok: AtomicBool::new(true),
            send_delay: Mutex::new(Duration::ZERO),
            refresh_delay: Mutex::new(Duration::ZERO),
            login_delay: Mutex::new(Duration::ZERO),
            send_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every `send` fails with `Unavailable`
    pub fn broken(kind: ProviderKind) -> Arc<Self> {
        let provider = Self::healthy(kind);
        provider.always_fail.store(true, Ordering::SeqCst);
        provider
    }

    pub fn queue(&self, reply: Result<ProviderReply, ProviderError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_failures(&self, count: usize) {
        for i in 0..count {
            self.queue(Err(ProviderError::Unavailable(format!("scripted failure {}", i + 1))));
        }
    }

    pub fn set_session_valid(&self, valid: bool) {
        self.session_valid.store(valid, Ordering::SeqCst);
    }

    pub fn set_refresh_ok(&self, ok: bool) {
        self.refresh_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_login_ok(&self, ok: bool) {
        self.login_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = delay;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn set_login_delay(&self, delay: Duration) {
        *self.login_delay.lock().unwrap() = delay;
    }

    pub fn sends(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn checks(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn send(&self, prompt: &str, _context: &str) -> Result<ProviderReply, ProviderError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(reply) => reply,
            None if self.always_fail.load(Ordering::SeqCst) => {
                Err(ProviderError::Unavailable(format!("{} is down", self.kind)))
            }
            None => Ok(ProviderReply::new(format!("{} response", self.kind))
                .with_tokens(10)
                .with_latency(delay)),
        }
    }

    async fn check_session(&self) -> Result<bool, ProviderError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session_valid.load(Ordering::SeqCst))
    }

    async fn refresh_session(&self) -> Result<bool, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let ok = self.refresh_ok.load(Ordering::SeqCst);
        if ok {
            self.session_valid.store(true, Ordering::SeqCst);
        }
        Ok(ok)
    }

    async fn login_flow(&self, _timeout: Duration) -> Result<bool, ProviderError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.login_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let ok = self.login_ok.load(Ordering::SeqCst);
        if ok {
            self.session_valid.store(true, Ordering::SeqCst);
        }
        Ok(ok)
    }

    async fn save_session(&self) -> Result<Option<Credential>, ProviderError> {
        Ok(Some(
            Credential::new(format!("{}-cookie", self.kind)).with_item_count(1),
        ))
    }

    async fn load_session(&self, _credential: &Credential) -> Result<bool, ProviderError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

pub(crate) fn as_adapters(providers: &[Arc<MockProvider>]) -> Vec<Arc<dyn ProviderAdapter>> {
    providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn ProviderAdapter>)
        .collect()
}

/// One healthy mock per provider kind
pub(crate) fn healthy_fleet() -> HashMap<ProviderKind, Arc<MockProvider>> {
    ProviderKind::ALL
        .into_iter()
        .map(|k| (k, MockProvider::healthy(k)))
        .collect()
}

pub(crate) fn fleet_adapters(
    fleet: &HashMap<ProviderKind, Arc<MockProvider>>,
) -> Vec<Arc<dyn ProviderAdapter>> {
    let providers: Vec<_> = ProviderKind::ALL.iter().map(|k| Arc::clone(&fleet[k])).collect();
    as_adapters(&providers)
}

// -- Credential store --------------------------------------------------------

#[derive(Default)]
pub(crate) struct InMemoryCredentialStore {
    credentials: Mutex<HashMap<ProviderKind, Credential>>,
    metadata: Mutex<HashMap<ProviderKind, SessionMetadata>>,
    pub metadata_writes: AtomicUsize,
    pub invalidations: AtomicUsize,
}

impl InMemoryCredentialStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn metadata_of(&self, provider: ProviderKind) -> Option<SessionMetadata> {
        self.metadata.lock().unwrap().get(&provider).cloned()
    }

    pub fn credential_of(&self, provider: ProviderKind) -> Option<Credential> {
        self.credentials.lock().unwrap().get(&provider).cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn save(
        &self,
        provider: ProviderKind,
        credential: &Credential,
    ) -> Result<(), StoreError> {
        self.credentials
            .lock()
            .unwrap()
            .insert(provider, credential.clone());
        Ok(())
    }

    async fn load(&self, provider: ProviderKind) -> Result<Option<Credential>, StoreError> {
        Ok(self.credential_of(provider))
    }

    async fn invalidate(&self, provider: ProviderKind) -> Result<(), StoreError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().unwrap().remove(&provider);
        Ok(())
    }

    async fn load_metadata(
        &self,
        provider: ProviderKind,
    ) -> Result<Option<SessionMetadata>, StoreError> {
        Ok(self.metadata_of(provider))
    }

    async fn save_metadata(&self, metadata: &SessionMetadata) -> Result<(), StoreError> {
        self.metadata_writes.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .lock()
            .unwrap()
            .insert(metadata.provider, metadata.clone());
        Ok(())
    }
}

// -- Pipeline store ----------------------------------------------------------

#[derive(Default)]
pub(crate) struct InMemoryPipelineStore {
    sessions: Mutex<HashMap<String, PipelineSession>>,
    /// State of every saved snapshot, in save order
    pub saved_states: Mutex<Vec<PipelineState>>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, id: &str) -> Option<PipelineSession> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    pub fn insert(&self, session: PipelineSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id().to_string(), session);
    }

    pub fn states(&self) -> Vec<PipelineState> {
        self.saved_states.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn save(&self, session: &PipelineSession) -> Result<(), StoreError> {
        self.saved_states.lock().unwrap().push(session.state());
        self.insert(session.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<PipelineSession>, StoreError> {
        Ok(self.get(id))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let mut list: Vec<SessionSummary> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .map(SessionSummary::from)
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }
}

// -- Summarizers -------------------------------------------------------------

pub(crate) struct FailingSummarizer {
    pub calls: AtomicUsize,
}

impl FailingSummarizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ContextSummarizer for FailingSummarizer {
    async fn summarize(&self, _context: &str, _ratio: f64) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SummarizeError("summarizer offline".to_string()))
    }
}

/// Keeps the first `ratio` share of the text
pub(crate) struct HalvingSummarizer {
    pub calls: AtomicUsize,
}

impl HalvingSummarizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ContextSummarizer for HalvingSummarizer {
    async fn summarize(&self, context: &str, ratio: f64) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let keep = (context.len() as f64 * ratio) as usize;
        Ok(aigenflow_domain::util::truncate_str(context, keep).to_string())
    }
}
