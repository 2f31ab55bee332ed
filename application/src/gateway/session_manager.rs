//! Provider session lifecycle and the recovery chain.
//!
//! [`SessionManager`] keeps one [`SessionState`] per registered provider and
//! answers a single question for the router: is this provider usable right
//! now? When it is not, the manager runs stages 1 and 2 of the recovery
//! chain:
//!
//! 1. silent refresh (`refresh_session`, bounded by `refresh_timeout`)
//! 2. interactive login (`login_flow`, bounded by `login_timeout`)
//!
//! If both fail the provider is marked `Failed` for the rest of the run and
//! the router takes over with fallbacks and the safety net (stages 3 and 4).
//!
//! Recovery is single-flight per provider: each slot carries an async mutex,
//! and callers that queued behind a recovery re-read the state after
//! acquiring it instead of starting their own.

use crate::config::RecoveryConfig;
use crate::events::EventBus;
use crate::ports::credential_store::CredentialStore;
use crate::ports::provider_adapter::ProviderAdapter;
use aigenflow_domain::{PipelineEvent, ProviderKind, RecoveryStage, SessionMetadata, SessionState};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Errors surfaced once the manager has given up on a provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session for {0} expired and interactive login is disabled")]
    Expired(ProviderKind),

    #[error("Stored session for {0} is corrupted")]
    Corrupted(ProviderKind),

    #[error("{provider} {stage} timed out after {after:?}")]
    Timeout {
        provider: ProviderKind,
        stage: &'static str,
        after: Duration,
    },

    #[error("Session for {0} could not be recovered")]
    Unrecoverable(ProviderKind),

    #[error("No adapter registered for {0}")]
    UnknownProvider(ProviderKind),
}

/// Snapshot for status reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub provider: ProviderKind,
    pub state: SessionState,
    pub metadata: Option<SessionMetadata>,
    /// Recovery flows started during this run
    pub recoveries: usize,
}

struct SlotInner {
    state: SessionState,
    metadata: Option<SessionMetadata>,
}

/// Per-provider state plus the single-flight recovery lock
struct ProviderSlot {
    inner: Mutex<SlotInner>,
    recovery: tokio::sync::Mutex<()>,
    recoveries: AtomicUsize,
}

impl ProviderSlot {
    fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SessionState::Uninitialized,
                metadata: None,
            }),
            recovery: tokio::sync::Mutex::new(()),
            recoveries: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state(&self) -> SessionState {
        self.lock().state
    }
}

/// Owner of every provider's session state for one process.
pub struct SessionManager {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    slots: HashMap<ProviderKind, ProviderSlot>,
    store: Arc<dyn CredentialStore>,
    config: RecoveryConfig,
    events: EventBus,
}

impl SessionManager {
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        store: Arc<dyn CredentialStore>,
        config: RecoveryConfig,
    ) -> Self {
        let adapters: HashMap<_, _> = adapters.into_iter().map(|a| (a.kind(), a)).collect();
        let slots = adapters.keys().map(|k| (*k, ProviderSlot::new())).collect();
        Self {
            adapters,
            slots,
            store,
            config,
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Registered providers in stable order
    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut providers: Vec<_> = self.adapters.keys().copied().collect();
        providers.sort();
        providers
    }

    pub fn adapter(&self, provider: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn state(&self, provider: ProviderKind) -> Option<SessionState> {
        self.slots.get(&provider).map(ProviderSlot::state)
    }

    pub fn is_failed(&self, provider: ProviderKind) -> bool {
        self.state(provider) == Some(SessionState::Failed)
    }

    /// Whether a fallback attempt on `provider` could succeed without
    /// waiting: registered, and neither recovering nor failed.
    pub fn is_available(&self, provider: ProviderKind) -> bool {
        matches!(
            self.state(provider),
            Some(
                SessionState::Uninitialized | SessionState::Valid | SessionState::Expired
            )
        )
    }

    pub fn recovery_count(&self, provider: ProviderKind) -> usize {
        self.slots
            .get(&provider)
            .map(|s| s.recoveries.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Make sure `provider` has a usable session.
    ///
    /// Returns immediately for a fresh valid session, fails immediately for
    /// a failed provider, and otherwise validates or recovers under the
    /// provider's recovery lock.
    pub async fn ensure_valid(&self, provider: ProviderKind) -> Result<(), SessionError> {
        let slot = self.slot(provider)?;
        if let Some(settled) = self.settled(provider, slot) {
            return settled;
        }

        let _guard = slot.recovery.lock().await;
        if let Some(settled) = self.settled(provider, slot) {
            debug!(provider = %provider, "Session settled while waiting for recovery lock");
            return settled;
        }
        self.establish(provider, slot).await
    }

    /// Mark a session expired after the provider rejected it mid-call.
    pub fn report_invalid(&self, provider: ProviderKind) {
        if let Some(slot) = self.slots.get(&provider) {
            let mut inner = slot.lock();
            if inner.state == SessionState::Valid {
                info!(provider = %provider, "Provider reported an invalid session");
                inner.state = SessionState::Expired;
            }
        }
    }

    /// Validate every registered provider without recovering any.
    pub async fn check_all(&self) -> Vec<ProviderStatus> {
        let checks = self.providers().into_iter().map(|provider| async move {
            if let (Some(slot), Some(adapter)) = (self.slots.get(&provider), self.adapter(provider))
            {
                let _guard = slot.recovery.lock().await;
                if slot.state() == SessionState::Uninitialized {
                    self.restore(provider, slot, adapter.as_ref()).await;
                }
                if slot.state() != SessionState::Failed {
                    let valid = self.check(provider, adapter.as_ref()).await;
                    self.record_attempt(provider, slot, valid).await;
                    self.set_state(
                        provider,
                        slot,
                        if valid {
                            SessionState::Valid
                        } else {
                            SessionState::Expired
                        },
                    );
                }
            }
            self.snapshot(provider).await
        });
        join_all(checks).await
    }

    /// State and metadata of every provider, without decrypting anything.
    pub async fn status(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::new();
        for provider in self.providers() {
            statuses.push(self.snapshot(provider).await);
        }
        statuses
    }

    /// Force the interactive login flow and persist the new credential.
    ///
    /// The previous credential and its key are discarded first.
    pub async fn relogin(&self, provider: ProviderKind) -> Result<(), SessionError> {
        let slot = self.slot(provider)?;
        let adapter = self
            .adapter(provider)
            .ok_or(SessionError::UnknownProvider(provider))?;
        let _guard = slot.recovery.lock().await;

        if let Err(e) = self.store.invalidate(provider).await {
            warn!(provider = %provider, error = %e, "Could not discard previous credential");
        }
        self.set_state(provider, slot, SessionState::Recovering);
        slot.recoveries.fetch_add(1, Ordering::SeqCst);

        match self.login(provider, adapter.as_ref()).await {
            Ok(true) => {
                self.record_attempt(provider, slot, true).await;
                self.finish_recovery(provider, slot, adapter.as_ref(), RecoveryStage::InteractiveLogin)
                    .await
            }
            outcome => {
                self.record_attempt(provider, slot, false).await;
                self.set_state(provider, slot, SessionState::Failed);
                Err(match outcome {
                    Err(e) => e,
                    Ok(_) => SessionError::Unrecoverable(provider),
                })
            }
        }
    }

    // ==================== Internals ====================

    fn slot(&self, provider: ProviderKind) -> Result<&ProviderSlot, SessionError> {
        self.slots
            .get(&provider)
            .ok_or(SessionError::UnknownProvider(provider))
    }

    /// Outcome that needs no I/O, if any
    fn settled(
        &self,
        provider: ProviderKind,
        slot: &ProviderSlot,
    ) -> Option<Result<(), SessionError>> {
        let inner = slot.lock();
        match inner.state {
            SessionState::Failed => Some(Err(SessionError::Unrecoverable(provider))),
            SessionState::Valid if !self.is_stale(inner.metadata.as_ref()) => Some(Ok(())),
            _ => None,
        }
    }

    fn is_stale(&self, metadata: Option<&SessionMetadata>) -> bool {
        metadata
            .map(|m| m.is_stale(self.config.validation_ttl_chrono(), Utc::now()))
            .unwrap_or(true)
    }

    /// Validate, then recover if needed. Caller holds the recovery lock.
    async fn establish(&self, provider: ProviderKind, slot: &ProviderSlot) -> Result<(), SessionError> {
        let adapter = self
            .adapter(provider)
            .ok_or(SessionError::UnknownProvider(provider))?;

        let state = slot.state();
        if state == SessionState::Uninitialized {
            self.restore(provider, slot, adapter.as_ref()).await;
        }

        if matches!(state, SessionState::Uninitialized | SessionState::Valid) {
            let valid = self.check(provider, adapter.as_ref()).await;
            self.record_attempt(provider, slot, valid).await;
            if valid {
                debug!(provider = %provider, "Session validated");
                self.set_state(provider, slot, SessionState::Valid);
                return Ok(());
            }
            info!(provider = %provider, "Session expired");
            self.set_state(provider, slot, SessionState::Expired);
        }

        self.recover(provider, slot, adapter.as_ref()).await
    }

    /// Install the stored credential, if any, into the adapter.
    async fn restore(&self, provider: ProviderKind, slot: &ProviderSlot, adapter: &dyn ProviderAdapter) {
        match self.store.load_metadata(provider).await {
            Ok(Some(metadata)) => {
                let mut inner = slot.lock();
                if inner.metadata.is_none() {
                    inner.metadata = Some(metadata);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(provider = %provider, error = %e, "Could not read session metadata"),
        }

        let credential = match self.store.load(provider).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                debug!(provider = %provider, "No stored credential");
                return;
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "{}", SessionError::Corrupted(provider));
                return;
            }
        };

        match adapter.load_session(&credential).await {
            Ok(true) => debug!(provider = %provider, "Stored credential loaded"),
            Ok(false) => debug!(provider = %provider, "Adapter rejected stored credential"),
            Err(e) => warn!(provider = %provider, error = %e, "Loading stored credential failed"),
        }
    }

    async fn check(&self, provider: ProviderKind, adapter: &dyn ProviderAdapter) -> bool {
        match timeout(self.config.refresh_timeout, adapter.check_session()).await {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                warn!(provider = %provider, error = %e, "Session check failed");
                false
            }
            Err(_) => {
                warn!(provider = %provider, "Session check timed out");
                false
            }
        }
    }

    /// Stages 1 and 2. Caller holds the recovery lock.
    async fn recover(
        &self,
        provider: ProviderKind,
        slot: &ProviderSlot,
        adapter: &dyn ProviderAdapter,
    ) -> Result<(), SessionError> {
        self.set_state(provider, slot, SessionState::Recovering);
        slot.recoveries.fetch_add(1, Ordering::SeqCst);
        info!(provider = %provider, "Starting session recovery");

        // Stage 1: silent refresh
        let refreshed = match timeout(self.config.refresh_timeout, adapter.refresh_session()).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                warn!(provider = %provider, error = %e, "Silent refresh failed");
                false
            }
            Err(_) => {
                warn!(provider = %provider, "Silent refresh timed out");
                false
            }
        };
        self.record_attempt(provider, slot, refreshed).await;
        if refreshed {
            return self
                .finish_recovery(provider, slot, adapter, RecoveryStage::SilentRefresh)
                .await;
        }

        // Stage 2: interactive login
        if !self.config.interactive_login {
            self.set_state(provider, slot, SessionState::Failed);
            warn!(provider = %provider, "Silent refresh failed and interactive login is disabled");
            return Err(SessionError::Expired(provider));
        }

        let outcome = self.login(provider, adapter).await;
        let logged_in = matches!(outcome, Ok(true));
        self.record_attempt(provider, slot, logged_in).await;
        if logged_in {
            return self
                .finish_recovery(provider, slot, adapter, RecoveryStage::InteractiveLogin)
                .await;
        }

        self.set_state(provider, slot, SessionState::Failed);
        error!(provider = %provider, "Session recovery exhausted, provider disabled for this run");
        Err(match outcome {
            Err(e) => e,
            Ok(_) => SessionError::Unrecoverable(provider),
        })
    }

    async fn login(
        &self,
        provider: ProviderKind,
        adapter: &dyn ProviderAdapter,
    ) -> Result<bool, SessionError> {
        let limit = self.config.login_timeout;
        info!(provider = %provider, timeout_secs = limit.as_secs(), "Waiting for interactive login");
        match timeout(limit, adapter.login_flow(limit)).await {
            Ok(Ok(ok)) => Ok(ok),
            Ok(Err(e)) => {
                warn!(provider = %provider, error = %e, "Interactive login failed");
                Ok(false)
            }
            Err(_) => {
                warn!(provider = %provider, "Interactive login timed out");
                Err(SessionError::Timeout {
                    provider,
                    stage: "interactive login",
                    after: limit,
                })
            }
        }
    }

    async fn finish_recovery(
        &self,
        provider: ProviderKind,
        slot: &ProviderSlot,
        adapter: &dyn ProviderAdapter,
        stage: RecoveryStage,
    ) -> Result<(), SessionError> {
        self.persist_credential(provider, slot, adapter).await;
        self.set_state(provider, slot, SessionState::Valid);
        info!(provider = %provider, stage = ?stage, "Session recovered");
        self.events.publish(PipelineEvent::ProviderRecovered {
            provider,
            stage,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn persist_credential(
        &self,
        provider: ProviderKind,
        slot: &ProviderSlot,
        adapter: &dyn ProviderAdapter,
    ) {
        let credential = match adapter.save_session().await {
            Ok(Some(credential)) => credential,
            Ok(None) => return,
            Err(e) => {
                warn!(provider = %provider, error = %e, "Could not export session");
                return;
            }
        };
        if let Err(e) = self.store.save(provider, &credential).await {
            warn!(provider = %provider, error = %e, "Could not store credential");
            return;
        }
        let metadata = {
            let mut inner = slot.lock();
            let metadata = inner
                .metadata
                .get_or_insert_with(|| SessionMetadata::new(provider));
            metadata.item_count = credential.item_count();
            metadata.clone()
        };
        self.save_metadata(&metadata).await;
    }

    /// Update metadata for a validation or recovery attempt.
    async fn record_attempt(&self, provider: ProviderKind, slot: &ProviderSlot, valid: bool) {
        let metadata = {
            let mut inner = slot.lock();
            let metadata = inner
                .metadata
                .get_or_insert_with(|| SessionMetadata::new(provider));
            metadata.record_validation(valid, Utc::now());
            metadata.clone()
        };
        self.save_metadata(&metadata).await;
    }

    async fn save_metadata(&self, metadata: &SessionMetadata) {
        if let Err(e) = self.store.save_metadata(metadata).await {
            warn!(provider = %metadata.provider, error = %e, "Could not store session metadata");
        }
    }

    fn set_state(&self, provider: ProviderKind, slot: &ProviderSlot, next: SessionState) {
        let mut inner = slot.lock();
        if inner.state == next {
            return;
        }
        if !inner.state.can_transition_to(next) {
            warn!(provider = %provider, from = %inner.state, to = %next, "Unexpected session transition");
        }
        debug!(provider = %provider, from = %inner.state, to = %next, "Session state change");
        inner.state = next;
    }

    async fn snapshot(&self, provider: ProviderKind) -> ProviderStatus {
        let (state, cached) = match self.slots.get(&provider) {
            Some(slot) => {
                let inner = slot.lock();
                (inner.state, inner.metadata.clone())
            }
            None => (SessionState::Uninitialized, None),
        };
        let metadata = match self.store.load_metadata(provider).await {
            Ok(Some(stored)) => Some(stored),
            _ => cached,
        };
        ProviderStatus {
            provider,
            state,
            metadata,
            recoveries: self.recovery_count(provider),
        }
    }
}
