//! Session metadata, stored next to the encrypted credential

use crate::core::provider::ProviderKind;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Validation bookkeeping for one provider session.
///
/// Readable without decrypting the credential, so status reporting never
/// touches secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub provider: ProviderKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_validated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_valid: bool,
    /// Number of items (cookies, tokens) in the stored credential
    #[serde(default)]
    pub item_count: usize,
}

impl SessionMetadata {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            created_at: Utc::now(),
            last_validated: None,
            is_valid: false,
            item_count: 0,
        }
    }

    /// Record a validation or recovery attempt
    pub fn record_validation(&mut self, valid: bool, at: DateTime<Utc>) {
        self.is_valid = valid;
        self.last_validated = Some(at);
    }

    /// True when the session was never validated, or last validated more
    /// than `ttl` before `now`.
    pub fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match self.last_validated {
            Some(at) => now - at > ttl,
            None => true,
        }
    }
}
