//! File-backed encrypted credential store.
//!
//! Layout, one directory per provider:
//!
//! ```text
//! <root>/<provider>/credential.enc     base64(nonce || ciphertext)
//! <root>/<provider>/credential.key     base64 key, mode 0600
//! <root>/<provider>/session_meta.json  plaintext SessionMetadata
//! ```
//!
//! Every provider has its own key. All writes go through a temp file and
//! rename. Blocking file I/O runs on the blocking pool.

use super::cipher::{self, SecretError};
use crate::fs::{atomic_write, remove_if_exists};
use aigenflow_application::{CredentialStore, StoreError};
use aigenflow_domain::{Credential, ProviderKind, SessionMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PAYLOAD_FILE: &str = "credential.enc";
const KEY_FILE: &str = "credential.key";
const METADATA_FILE: &str = "session_meta.json";

/// Plaintext form of a credential, only ever held in memory
#[derive(Serialize, Deserialize)]
struct Payload {
    secret: String,
    item_count: usize,
}

pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn provider_dir(&self, provider: ProviderKind) -> PathBuf {
        self.root.join(provider.as_str())
    }

    fn save_blocking(dir: &Path, credential: &Credential) -> Result<(), StoreError> {
        let key = cipher::load_or_create_key(&dir.join(KEY_FILE)).map_err(encryption)?;
        let payload = Payload {
            secret: credential.expose().to_string(),
            item_count: credential.item_count(),
        };
        let plaintext =
            serde_json::to_string(&payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let encrypted = cipher::encrypt(&plaintext, &key).map_err(encryption)?;
        atomic_write(&dir.join(PAYLOAD_FILE), encrypted.as_bytes(), Some(0o600)).map_err(io)
    }

    fn load_blocking(dir: &Path) -> Result<Option<Credential>, StoreError> {
        let payload_path = dir.join(PAYLOAD_FILE);
        let raw = match std::fs::read(&payload_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io(e)),
        };

        let decoded = String::from_utf8(raw)
            .map_err(|_| SecretError::InvalidEncoding)
            .and_then(|encoded| {
                cipher::read_key(&dir.join(KEY_FILE)).and_then(|key| cipher::decrypt(&encoded, &key))
            })
            .and_then(|plaintext| {
                serde_json::from_str::<Payload>(&plaintext).map_err(|_| SecretError::InvalidEncoding)
            });

        match decoded {
            Ok(payload) => {
                Ok(Some(Credential::new(payload.secret).with_item_count(payload.item_count)))
            }
            // A missing key file reads as an I/O error but leaves the payload useless
            Err(e) if e.is_corruption() || !dir.join(KEY_FILE).exists() => {
                warn!(dir = %dir.display(), error = %e, "Stored credential is unreadable, deleting it");
                remove_if_exists(&payload_path).map_err(io)?;
                remove_if_exists(&dir.join(KEY_FILE)).map_err(io)?;
                Ok(None)
            }
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    fn invalidate_blocking(dir: &Path) -> Result<(), StoreError> {
        remove_if_exists(&dir.join(PAYLOAD_FILE)).map_err(io)?;
        remove_if_exists(&dir.join(KEY_FILE)).map_err(io)?;

        let meta_path = dir.join(METADATA_FILE);
        if let Some(mut meta) = Self::load_metadata_blocking(dir)? {
            meta.is_valid = false;
            meta.item_count = 0;
            Self::write_metadata(&meta_path, &meta)?;
        }
        Ok(())
    }

    fn load_metadata_blocking(dir: &Path) -> Result<Option<SessionMetadata>, StoreError> {
        let path = dir.join(METADATA_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io(e)),
        };
        match serde_json::from_str(&raw) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Session metadata is corrupted, deleting it");
                remove_if_exists(&path).map_err(io)?;
                Ok(None)
            }
        }
    }

    fn write_metadata(path: &Path, metadata: &SessionMetadata) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        atomic_write(path, &json, None).map_err(io)
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Io(format!("blocking task failed: {e}")))?
}

fn io(e: std::io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

fn encryption(e: SecretError) -> StoreError {
    StoreError::Encryption(e.to_string())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(
        &self,
        provider: ProviderKind,
        credential: &Credential,
    ) -> Result<(), StoreError> {
        let dir = self.provider_dir(provider);
        let items = credential.item_count();
        let credential = credential.clone();
        blocking(move || Self::save_blocking(&dir, &credential)).await?;
        debug!(provider = %provider, items, "Credential saved");
        Ok(())
    }

    async fn load(&self, provider: ProviderKind) -> Result<Option<Credential>, StoreError> {
        let dir = self.provider_dir(provider);
        blocking(move || Self::load_blocking(&dir)).await
    }

    async fn invalidate(&self, provider: ProviderKind) -> Result<(), StoreError> {
        let dir = self.provider_dir(provider);
        blocking(move || Self::invalidate_blocking(&dir)).await?;
        debug!(provider = %provider, "Credential invalidated");
        Ok(())
    }

    async fn load_metadata(
        &self,
        provider: ProviderKind,
    ) -> Result<Option<SessionMetadata>, StoreError> {
        let dir = self.provider_dir(provider);
        blocking(move || Self::load_metadata_blocking(&dir)).await
    }

    async fn save_metadata(&self, metadata: &SessionMetadata) -> Result<(), StoreError> {
        let path = self.provider_dir(metadata.provider).join(METADATA_FILE);
        let metadata = metadata.clone();
        blocking(move || Self::write_metadata(&path, &metadata)).await
    }
}
