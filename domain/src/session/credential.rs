//! In-memory provider credential

use secrecy::{ExposeSecret, SecretString};

/// Exported provider session (cookies, tokens) in plaintext form.
///
/// Wrapped in a [`SecretString`] so it is zeroized on drop and never
/// appears in `Debug` output or logs. Encryption happens at the storage
/// boundary.
#[derive(Clone)]
pub struct Credential {
    secret: SecretString,
    item_count: usize,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            item_count: 0,
        }
    }

    /// Record how many items (cookies, tokens) the credential bundles
    pub fn with_item_count(mut self, count: usize) -> Self {
        self.item_count = count;
        self
    }

    /// Plaintext, for the encryption and adapter boundaries only
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.secret.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"[REDACTED]")
            .field("item_count", &self.item_count)
            .finish()
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.item_count == other.item_count
            && self.secret.expose_secret() == other.secret.expose_secret()
    }
}

impl Eq for Credential {}
