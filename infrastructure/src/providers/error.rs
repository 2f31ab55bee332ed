//! Error types for the bridge adapter

use aigenflow_application::ProviderError;
use std::time::Duration;
use thiserror::Error;

/// Exit code a bridge uses when the provider rejected the session
pub const EXIT_SESSION_INVALID: i32 = 3;
/// Exit code a bridge uses when the provider is throttling us
pub const EXIT_RATE_LIMITED: i32 = 4;

/// Errors that can occur when running a bridge process
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge command not found: {command} ({reason})")]
    NotFound { command: String, reason: String },

    #[error("Failed to run bridge: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse bridge output: {error}\nRaw output: {raw}")]
    Parse { error: String, raw: String },

    #[error("Bridge exited with {}: {stderr}", code.map_or("a signal".to_string(), |c| format!("code {c}")))]
    Exit { code: Option<i32>, stderr: String },

    #[error("Bridge timed out after {0:?}")]
    Timeout(Duration),
}

impl BridgeError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BridgeError::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<BridgeError> for ProviderError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Exit {
                code: Some(EXIT_SESSION_INVALID),
                stderr,
            } => ProviderError::SessionInvalid(stderr),
            BridgeError::Exit {
                code: Some(EXIT_RATE_LIMITED),
                stderr,
            } => ProviderError::RateLimited(stderr),
            BridgeError::Timeout(d) => ProviderError::Timeout(d),
            BridgeError::Parse { error, .. } => ProviderError::InvalidResponse(error),
            BridgeError::Serialization(e) => ProviderError::InvalidResponse(e.to_string()),
            other => ProviderError::Unavailable(other.to_string()),
        }
    }
}
