//! Credential store port
//!
//! At-rest storage of provider credentials and their session metadata.

use aigenflow_domain::{Credential, ProviderKind, SessionMetadata};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from persistence ports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Encryption error: {0}")]
    Encryption(String),
}

/// Encrypted credential storage, one entry per provider.
///
/// `load` returns `Ok(None)` both when nothing is stored and when the stored
/// entry could not be decrypted; a corrupted entry is deleted, never
/// reported as an error.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(&self, provider: ProviderKind, credential: &Credential)
    -> Result<(), StoreError>;

    async fn load(&self, provider: ProviderKind) -> Result<Option<Credential>, StoreError>;

    /// Remove the stored credential and its key
    async fn invalidate(&self, provider: ProviderKind) -> Result<(), StoreError>;

    /// Read metadata without touching the encrypted payload
    async fn load_metadata(
        &self,
        provider: ProviderKind,
    ) -> Result<Option<SessionMetadata>, StoreError>;

    async fn save_metadata(&self, metadata: &SessionMetadata) -> Result<(), StoreError>;
}
