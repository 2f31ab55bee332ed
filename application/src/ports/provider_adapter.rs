//! Provider adapter port
//!
//! Defines the interface for talking to one external AI service through its
//! session-based channel.

use aigenflow_domain::{Credential, ProviderKind};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors a provider call can fail with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The provider rejected the session; triggers recovery
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ProviderError::SessionInvalid(_))
    }
}

/// Successful reply to `send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub content: String,
    pub tokens_used: u32,
    pub latency: Duration,
}

impl ProviderReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: 0,
            latency: Duration::ZERO,
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_used = tokens;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Adapter for one AI service.
///
/// Implementations live in the infrastructure layer. The orchestrator and
/// router depend only on this capability set.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Send a prompt with the accumulated context and return the reply
    async fn send(&self, prompt: &str, context: &str) -> Result<ProviderReply, ProviderError>;

    /// Whether the current session is usable
    async fn check_session(&self) -> Result<bool, ProviderError>;

    /// Refresh the existing session without user interaction
    async fn refresh_session(&self) -> Result<bool, ProviderError>;

    /// Run the interactive login flow, giving up after `timeout`
    async fn login_flow(&self, timeout: Duration) -> Result<bool, ProviderError>;

    /// Export the current session so it can be stored encrypted.
    ///
    /// Returns `None` when there is nothing to export.
    async fn save_session(&self) -> Result<Option<Credential>, ProviderError>;

    /// Install a previously exported session
    async fn load_session(&self, credential: &Credential) -> Result<bool, ProviderError>;
}
