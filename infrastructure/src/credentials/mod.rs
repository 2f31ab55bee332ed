//! Encrypted at-rest storage of provider credentials.

pub mod cipher;
mod store;

pub use cipher::SecretError;
pub use store::FileCredentialStore;
