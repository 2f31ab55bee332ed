//! Console output formatter for pipeline sessions

use crate::output::formatter::OutputFormatter;
use aigenflow_application::{ProviderStatus, SessionSummary};
use aigenflow_domain::{PhaseResult, PipelineSession, PipelineState, SessionState};
use colored::{ColoredString, Colorize};

/// Characters of each response shown in the full report
const CONTENT_PREVIEW_CHARS: usize = 400;

/// Formats pipeline sessions for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete session
    pub fn format(session: &PipelineSession) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("aigenflow Pipeline"));
        output.push('\n');
        output.push_str(&Self::overview(session));

        for result in session.results() {
            output.push_str(&Self::phase_section(result));
        }

        if let Some(failure) = session.last_failure() {
            output.push_str(&Self::section_header(&format!(
                "Phase {}: {} (failed)",
                failure.phase_number, failure.name
            )));
            output.push_str(&format!("{} {}\n", "Error:".red().bold(), failure.error));
            for attempt in &failure.ai_responses {
                output.push_str(&format!(
                    "  {} {} on {} ({}, attempt {}): {}\n",
                    "x".red(),
                    attempt.task,
                    attempt.provider,
                    attempt.step.as_str(),
                    attempt.attempt,
                    attempt.error.as_deref().unwrap_or("Unknown")
                ));
            }
        }

        output.push_str(&Self::next_step(session));
        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(session: &PipelineSession) -> String {
        serde_json::to_string_pretty(session).unwrap_or_else(|_| "{}".to_string())
    }

    /// State and one line per phase (concise output)
    pub fn format_summary(session: &PipelineSession) -> String {
        let mut output = Self::overview(session);
        for number in 1..=session.phase_count() {
            let name = session
                .config()
                .phase_at(number)
                .map(|p| p.display_name())
                .unwrap_or("?");
            let mark = match session.latest_result(number) {
                Some(_) => "v".green(),
                None if session.last_failure().map(|f| f.phase_number) == Some(number) => {
                    "x".red()
                }
                None => "-".dimmed(),
            };
            output.push_str(&format!("  {mark} Phase {number}: {name}\n"));
        }
        output.push_str(&Self::next_step(session));
        output
    }

    /// Table of persisted runs, newest first
    pub fn format_sessions(sessions: &[SessionSummary]) -> String {
        if sessions.is_empty() {
            return format!("{}\n", "No pipeline runs found.".dimmed());
        }
        let mut output = format!(
            "{}\n",
            format!(
                "{:<38} {:<10} {:>6}  {:<19}  {}",
                "SESSION", "STATE", "PHASES", "UPDATED", "TOPIC"
            )
            .bold()
        );
        for s in sessions {
            output.push_str(&format!(
                "{:<38} {:<10} {:>6}  {:<19}  {}\n",
                s.id,
                Self::state_label(s.state),
                format!("{}/{}", s.completed_phases, s.phase_count),
                s.updated_at.format("%Y-%m-%d %H:%M:%S"),
                aigenflow_domain::util::preview(&s.topic, 50)
            ));
        }
        output
    }

    /// Provider session table for `check`
    pub fn format_providers(statuses: &[ProviderStatus]) -> String {
        let mut output = Self::section_header("Provider Sessions");
        for status in statuses {
            let state = match status.state {
                SessionState::Valid => status.state.as_str().green(),
                SessionState::Failed => status.state.as_str().red(),
                SessionState::Expired | SessionState::Recovering => status.state.as_str().yellow(),
                SessionState::Uninitialized => status.state.as_str().dimmed(),
            };
            let validated = status
                .metadata
                .as_ref()
                .and_then(|m| m.last_validated)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            output.push_str(&format!(
                "  {:<12} {:<14} last validated {}\n",
                status.provider.display_name(),
                state,
                validated
            ));
        }
        output
    }

    fn overview(session: &PipelineSession) -> String {
        let config = session.config();
        format!(
            "{} {}\n{} {}\n{} {}\n{} {} ({}, {})\n\n",
            "Topic:".cyan().bold(),
            config.topic(),
            "Session:".cyan().bold(),
            session.id(),
            "State:".cyan().bold(),
            Self::state_label(session.state()),
            "Document:".cyan().bold(),
            config.doc_type(),
            config.template().as_str(),
            config.language()
        )
    }

    fn phase_section(result: &PhaseResult) -> String {
        let mut output = Self::section_header(&format!(
            "Phase {}: {}",
            result.phase_number, result.name
        ));
        output.push_str(&format!(
            "{} responses, {} failed attempts, {} tokens, {:.1}s\n",
            result.successful_responses().count(),
            result.failed_attempts(),
            result.total_tokens(),
            result.duration().num_milliseconds() as f64 / 1000.0
        ));

        for response in &result.ai_responses {
            if response.success {
                output.push_str(&format!(
                    "\n{}\n{}\n",
                    format!("── {} via {} ──", response.task, response.provider)
                        .yellow()
                        .bold(),
                    Self::indent(
                        &aigenflow_domain::util::preview(&response.content, CONTENT_PREVIEW_CHARS),
                        "  "
                    )
                ));
            } else {
                output.push_str(&format!(
                    "\n{}\nError: {}\n",
                    format!("── {} on {} ──", response.task, response.provider)
                        .red()
                        .bold(),
                    response.error.as_deref().unwrap_or("Unknown")
                ));
            }
        }

        if !result.artifacts.is_empty() {
            let names: Vec<_> = result.artifacts.keys().map(String::as_str).collect();
            output.push_str(&format!("\n{} {}\n", "Artifacts:".cyan().bold(), names.join(", ")));
        }
        output
    }

    fn next_step(session: &PipelineSession) -> String {
        match session.state() {
            PipelineState::Completed => String::new(),
            _ => format!(
                "\n{} aigenflow resume {}\n",
                "Resume with:".dimmed(),
                session.id()
            ),
        }
    }

    fn state_label(state: PipelineState) -> ColoredString {
        let label = state.to_string();
        match state {
            PipelineState::Completed => label.green(),
            PipelineState::Failed => label.red(),
            PipelineState::Idle => label.dimmed(),
            PipelineState::Phase(_) => label.yellow(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, session: &PipelineSession) -> String {
        Self::format(session)
    }

    fn format_json(&self, session: &PipelineSession) -> String {
        Self::format_json(session)
    }

    fn format_summary(&self, session: &PipelineSession) -> String {
        Self::format_summary(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigenflow_domain::{
        AgentResponse, PhaseFailure, PhaseStatus, PhaseTask, PipelineConfig, ProviderKind,
        RouteStep,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn failed_session() -> PipelineSession {
        colored::control::set_override(false);
        let mut session =
            PipelineSession::new("run-7", PipelineConfig::new("Edge AI for retail shelves"));
        session.transition_to(PipelineState::Phase(1)).unwrap();
        let now = Utc::now();
        let mut artifacts = BTreeMap::new();
        artifacts.insert("framing".to_string(), "...".to_string());
        session
            .append_result(PhaseResult {
                phase_number: 1,
                name: "Framing".to_string(),
                status: PhaseStatus::Completed,
                ai_responses: vec![
                    AgentResponse::failure(ProviderKind::ChatGpt, PhaseTask::BrainstormChatGpt, "timeout", 10),
                    AgentResponse::success(ProviderKind::Gemini, PhaseTask::BrainstormChatGpt, "Ideas line 1\nIdeas line 2", 30, 900)
                        .at(RouteStep::Fallback, 2),
                ],
                summary: String::new(),
                artifacts,
                started_at: now,
                completed_at: now,
            })
            .unwrap();
        session.transition_to(PipelineState::Phase(2)).unwrap();
        session
            .fail(PhaseFailure {
                phase_number: 2,
                name: "Research".to_string(),
                error: "task deep_search_gemini exhausted all providers".to_string(),
                ai_responses: vec![
                    AgentResponse::failure(ProviderKind::Claude, PhaseTask::DeepSearchGemini, "rate limited", 5)
                        .at(RouteStep::SafetyNet, 5),
                ],
                failed_at: now,
            })
            .unwrap();
        session
    }

    #[test]
    fn test_format_full_report() {
        let output = ConsoleFormatter::format(&failed_session());
        assert!(output.contains("Topic: Edge AI for retail shelves"));
        assert!(output.contains("Phase 1: Framing"));
        assert!(output.contains("brainstorm_chatgpt via gemini"));
        assert!(output.contains("  Ideas line 2"));
        assert!(output.contains("Artifacts: framing"));
        assert!(output.contains("Phase 2: Research (failed)"));
        assert!(output.contains("safety_net, attempt 5"));
        assert!(output.contains("aigenflow resume run-7"));
    }

    #[test]
    fn test_format_summary_marks_phases() {
        let output = ConsoleFormatter::format_summary(&failed_session());
        assert!(output.contains("State: failed"));
        assert!(output.contains("v Phase 1: Framing"));
        assert!(output.contains("x Phase 2: Research"));
        assert!(output.contains("- Phase 5: Review"));
    }

    #[test]
    fn test_format_json_is_the_session() {
        let session = failed_session();
        let parsed: PipelineSession =
            serde_json::from_str(&ConsoleFormatter::format_json(&session)).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_format_sessions_table() {
        colored::control::set_override(false);
        assert!(ConsoleFormatter::format_sessions(&[]).contains("No pipeline runs"));

        let summary = SessionSummary::from(&failed_session());
        let table = ConsoleFormatter::format_sessions(&[summary]);
        assert!(table.contains("run-7"));
        assert!(table.contains("1/5"));
        assert!(table.contains("failed"));
    }

    #[test]
    fn test_format_providers() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format_providers(&[ProviderStatus {
            provider: ProviderKind::Perplexity,
            state: SessionState::Expired,
            metadata: None,
            recoveries: 0,
        }]);
        assert!(output.contains("Perplexity"));
        assert!(output.contains("expired"));
        assert!(output.contains("never"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
