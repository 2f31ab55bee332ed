//! Use cases
//!
//! - [`orchestrator::PipelineOrchestrator`]: run, resume and inspect pipeline sessions

pub mod orchestrator;
