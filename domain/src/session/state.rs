//! Provider session state machine
//!
//! ```text
//! Uninitialized -> Valid <-> Expired -> Recovering -> {Valid, Failed}
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle of one provider's session within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing loaded or checked yet
    #[default]
    Uninitialized,
    Valid,
    Expired,
    /// A recovery flow is in flight
    Recovering,
    /// Recovery exhausted; the provider is unusable for the rest of the run
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Valid => "valid",
            SessionState::Expired => "expired",
            SessionState::Recovering => "recovering",
            SessionState::Failed => "failed",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SessionState::Valid)
    }

    /// Whether `self -> next` is a legal move.
    ///
    /// `Failed -> Recovering` is only taken by an explicit operator relogin.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, next),
            (Uninitialized, Valid | Expired | Recovering)
                | (Valid, Expired | Recovering)
                | (Expired, Valid | Recovering)
                | (Recovering, Valid | Failed)
                | (Failed, Recovering)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
