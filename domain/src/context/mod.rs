//! Context passed between phases.
//!
//! - [`budget::ContextSettings`]: preview size and summarization threshold
//! - [`chain::ContextChain`]: rendered summary of prior phase results

pub mod budget;
pub mod chain;
