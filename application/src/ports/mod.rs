//! Port definitions (interfaces for external systems)
//!
//! Adapters implementing these live in the infrastructure layer.

pub mod credential_store;
pub mod pipeline_store;
pub mod provider_adapter;
pub mod summarizer;
