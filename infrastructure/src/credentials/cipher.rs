//! ChaCha20-Poly1305 encryption of credential payloads.
//!
//! Ciphertext layout: base64(nonce[12] || ciphertext+tag). Keys are 256-bit,
//! stored base64-encoded in their own file with mode 0600.

use crate::fs::atomic_write;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use std::path::Path;
use thiserror::Error;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

pub type Key = [u8; KEY_LEN];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("invalid encoding")]
    InvalidEncoding,
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("IO error: {0}")]
    Io(String),
}

impl SecretError {
    /// The stored data is unusable (as opposed to a transient I/O problem)
    pub fn is_corruption(&self) -> bool {
        !matches!(self, SecretError::Io(_) | SecretError::EncryptionFailed)
    }
}

/// Encrypt `plaintext`, returning base64 nonce + ciphertext.
pub fn encrypt(plaintext: &str, key: &Key) -> Result<String, SecretError> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let mut nonce_bytes = [0u8; NONCE_LEN];
    chacha20poly1305::aead::rand_core::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| SecretError::EncryptionFailed)?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(&combined))
}

/// Decrypt base64 nonce + ciphertext.
pub fn decrypt(encoded: &str, key: &Key) -> Result<String, SecretError> {
    let combined = STANDARD
        .decode(encoded.trim())
        .map_err(|_| SecretError::InvalidEncoding)?;
    if combined.len() < NONCE_LEN {
        return Err(SecretError::InvalidEncoding);
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = ChaCha20Poly1305::new(key.into());
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| SecretError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| SecretError::InvalidUtf8)
}

pub fn generate_key() -> Key {
    let mut key = [0u8; KEY_LEN];
    chacha20poly1305::aead::rand_core::RngCore::fill_bytes(&mut OsRng, &mut key);
    key
}

/// Read an existing key file. Non-base64 content is corruption, not I/O.
pub fn read_key(path: &Path) -> Result<Key, SecretError> {
    let encoded = std::fs::read(path).map_err(|e| SecretError::Io(e.to_string()))?;
    let bytes = STANDARD
        .decode(encoded.trim_ascii())
        .map_err(|_| SecretError::InvalidEncoding)?;
    bytes.try_into().map_err(|_| SecretError::InvalidKeyLength)
}

/// Load the key at `path`, creating it (mode 0600) if absent.
pub fn load_or_create_key(path: &Path) -> Result<Key, SecretError> {
    if path.exists() {
        return read_key(path);
    }
    let key = generate_key();
    atomic_write(path, STANDARD.encode(key).as_bytes(), Some(0o600))
        .map_err(|e| SecretError::Io(e.to_string()))?;
    Ok(key)
}
