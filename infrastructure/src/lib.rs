//! Infrastructure layer for aigenflow
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod credentials;
mod fs;
pub mod logging;
pub mod persistence;
pub mod providers;
pub mod summarizer;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use credentials::{FileCredentialStore, SecretError};
pub use logging::JsonlEventLogger;
pub use persistence::JsonPipelineStore;
pub use providers::{BridgeError, CommandProviderAdapter, build_adapters};
pub use summarizer::TruncatingSummarizer;
