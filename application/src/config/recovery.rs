//! Session recovery timing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds for the session recovery chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Bound on `check_session` and `refresh_session` calls
    pub refresh_timeout: Duration,
    /// Bound on the interactive login flow
    pub login_timeout: Duration,
    /// Whether stage 2 may prompt the operator at all
    pub interactive_login: bool,
    /// A valid session older than this is re-checked before use
    pub validation_ttl: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            refresh_timeout: Duration::from_secs(30),
            login_timeout: Duration::from_secs(120),
            interactive_login: true,
            validation_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl RecoveryConfig {
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    pub fn with_interactive_login(mut self, enabled: bool) -> Self {
        self.interactive_login = enabled;
        self
    }

    pub fn with_validation_ttl(mut self, ttl: Duration) -> Self {
        self.validation_ttl = ttl;
        self
    }

    /// `validation_ttl` as a chrono duration, for timestamp arithmetic
    pub fn validation_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.validation_ttl).unwrap_or(chrono::Duration::MAX)
    }
}
