//! Output formatter trait

use aigenflow_domain::PipelineSession;

/// Trait for formatting pipeline sessions
pub trait OutputFormatter {
    /// Every phase with its provider calls
    fn format(&self, session: &PipelineSession) -> String;

    /// Format as JSON
    fn format_json(&self, session: &PipelineSession) -> String;

    /// State and phase list only
    fn format_summary(&self, session: &PipelineSession) -> String;
}
