//! Structured pipeline event logging.
//!
//! Provides [`JsonlEventLogger`], a JSONL writer that appends every
//! [`PipelineEvent`](aigenflow_domain::PipelineEvent) published on the
//! [`EventBus`](aigenflow_application::EventBus) to a per-session file.

mod event_log;

pub use event_log::JsonlEventLogger;
