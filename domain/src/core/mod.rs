//! Core domain concepts shared across all subdomains.
//!
//! - [`provider::ProviderKind`]: external AI services (ChatGPT, Claude, Gemini, Perplexity)
//! - [`error::ConfigError`] / [`error::PipelineError`]: domain-level errors

pub mod error;
pub mod provider;
