//! Progress reporting for pipeline execution
//!
//! Both reporters consume [`PipelineEvent`]s from the event bus. The fancy
//! one draws a bar per phase; the simple one prints a line per event.

use aigenflow_domain::{PipelineEvent, RecoveryStage, RouteStep};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Something that renders pipeline events for the user
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Feed every event from `events` to `observer` until the bus closes.
pub fn spawn_observer(
    observer: Arc<dyn PipelineObserver>,
    mut events: UnboundedReceiver<PipelineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            observer.on_event(&event);
        }
    })
}

fn stage_name(stage: RecoveryStage) -> &'static str {
    match stage {
        RecoveryStage::SilentRefresh => "silent refresh",
        RecoveryStage::InteractiveLogin => "interactive login",
    }
}

/// One-line description of an event, or `None` for events not worth a line.
pub fn describe(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::PipelineStarted {
            session_id,
            topic,
            phase_count,
            ..
        } => Some(format!(
            "{} {} ({} phases, session {})",
            "=>".cyan(),
            topic.bold(),
            phase_count,
            session_id.dimmed()
        )),
        PipelineEvent::PipelineResumed {
            session_id,
            from_phase,
            ..
        } => Some(format!(
            "{} Resuming {} from phase {}",
            "=>".cyan(),
            session_id.dimmed(),
            from_phase
        )),
        PipelineEvent::PhaseStarted {
            phase,
            name,
            providers,
            ..
        } => Some(format!(
            "{} {} ({} tasks)",
            "->".cyan(),
            format!("Phase {phase}: {name}").bold(),
            providers.len()
        )),
        PipelineEvent::AgentCalled {
            task,
            provider,
            step,
            attempt,
            ..
        } if *step != RouteStep::Primary || *attempt > 1 => Some(format!(
            "  {} {} on {} ({}, attempt {})",
            "~".yellow(),
            task,
            provider,
            step.as_str(),
            attempt
        )),
        PipelineEvent::AgentCalled { .. } => None,
        PipelineEvent::AgentResponded {
            task,
            provider,
            success: true,
            latency_ms,
            ..
        } => Some(format!(
            "  {} {} via {} ({} ms)",
            "v".green(),
            task,
            provider,
            latency_ms
        )),
        PipelineEvent::AgentResponded {
            task,
            provider,
            error,
            ..
        } => Some(format!(
            "  {} {} on {}: {}",
            "x".red(),
            task,
            provider,
            error.as_deref().unwrap_or("failed")
        )),
        PipelineEvent::PhaseCompleted {
            phase,
            name,
            response_count,
            ..
        } => Some(format!(
            "{} Phase {}: {} complete ({} responses)",
            "v".green(),
            phase,
            name,
            response_count
        )),
        PipelineEvent::PhaseFailed {
            phase, name, error, ..
        } => Some(format!(
            "{} Phase {}: {} failed: {}",
            "x".red(),
            phase,
            name,
            error
        )),
        PipelineEvent::StateSaved { .. } => None,
        PipelineEvent::ProviderRecovered {
            provider, stage, ..
        } => Some(format!(
            "  {} {} session restored by {}",
            "+".green(),
            provider,
            stage_name(*stage)
        )),
        PipelineEvent::PipelineCompleted { phase_count, .. } => Some(format!(
            "{} Pipeline completed ({} phases)",
            "=>".green(),
            phase_count
        )),
        PipelineEvent::PipelineFailed {
            phase,
            provider,
            error,
            ..
        } => Some(format!(
            "{} Pipeline stopped at phase {}{}: {}",
            "=>".red(),
            phase,
            provider
                .map(|p| format!(" (last provider {p})"))
                .unwrap_or_default(),
            error
        )),
    }
}

/// Reports progress with a bar per phase
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn bar(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.phase_bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{line}");
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineObserver for ProgressReporter {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PhaseStarted {
                phase,
                name,
                providers,
                ..
            } => {
                let pb = self.multi.add(ProgressBar::new(providers.len() as u64));
                pb.set_style(Self::phase_style());
                pb.set_prefix(format!("Phase {phase}: {name}"));
                pb.set_message("Starting...");
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                if let Some(previous) = self.bar().replace(pb) {
                    previous.finish_and_clear();
                }
            }
            PipelineEvent::AgentCalled {
                task, provider, ..
            } => {
                if let Some(pb) = self.bar().as_ref() {
                    pb.set_message(format!("{task} on {provider}"));
                }
                if let Some(line) = describe(event) {
                    self.println(line);
                }
            }
            PipelineEvent::AgentResponded {
                task,
                provider,
                success,
                ..
            } => {
                if let Some(pb) = self.bar().as_ref() {
                    if *success {
                        pb.set_message(format!("{} {} via {}", "v".green(), task, provider));
                        pb.inc(1);
                    } else {
                        pb.set_message(format!("{} {} on {}", "x".red(), task, provider));
                    }
                }
            }
            PipelineEvent::PhaseCompleted { phase, .. } => {
                if let Some(pb) = self.bar().take() {
                    pb.finish_with_message(format!("{}", format!("Phase {phase} complete!").green()));
                }
            }
            PipelineEvent::PhaseFailed { phase, .. } => {
                if let Some(pb) = self.bar().take() {
                    pb.abandon_with_message(format!("{}", format!("Phase {phase} failed").red()));
                }
                if let Some(line) = describe(event) {
                    self.println(line);
                }
            }
            PipelineEvent::StateSaved { .. } => {}
            _ => {
                if let Some(line) = describe(event) {
                    self.println(line);
                }
            }
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl PipelineObserver for SimpleProgress {
    fn on_event(&self, event: &PipelineEvent) {
        if let Some(line) = describe(event) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigenflow_domain::{PhaseTask, ProviderKind};
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;

    fn plain(event: &PipelineEvent) -> Option<String> {
        colored::control::set_override(false);
        describe(event)
    }

    #[test]
    fn test_describe_phase_started() {
        let line = plain(&PipelineEvent::PhaseStarted {
            session_id: "s".to_string(),
            phase: 2,
            name: "Research".to_string(),
            providers: vec![ProviderKind::Gemini, ProviderKind::Perplexity],
            timestamp: Utc::now(),
        })
        .unwrap();
        assert_eq!(line, "-> Phase 2: Research (2 tasks)");
    }

    #[test]
    fn test_describe_only_interesting_calls() {
        let call = |step, attempt| PipelineEvent::AgentCalled {
            session_id: "s".to_string(),
            phase: 1,
            task: PhaseTask::BrainstormChatGpt,
            provider: ProviderKind::Claude,
            step,
            attempt,
            timestamp: Utc::now(),
        };
        assert!(plain(&call(RouteStep::Primary, 1)).is_none());
        let line = plain(&call(RouteStep::SafetyNet, 5)).unwrap();
        assert!(line.contains("safety_net"));
        assert!(line.contains("attempt 5"));
    }

    #[test]
    fn test_describe_failure_mentions_provider() {
        let line = plain(&PipelineEvent::PipelineFailed {
            session_id: "s".to_string(),
            phase: 3,
            provider: Some(ProviderKind::Claude),
            error: "task swot_chatgpt exhausted all providers".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();
        assert!(line.contains("phase 3"));
        assert!(line.contains("claude"));
        assert!(line.contains("exhausted"));
    }

    #[test]
    fn test_state_saved_is_silent() {
        assert!(
            plain(&PipelineEvent::StateSaved {
                session_id: "s".to_string(),
                state: aigenflow_domain::PipelineState::Completed,
                timestamp: Utc::now(),
            })
            .is_none()
        );
    }

    struct Recorder(StdMutex<Vec<&'static str>>);

    impl PipelineObserver for Recorder {
        fn on_event(&self, event: &PipelineEvent) {
            self.0.lock().unwrap().push(event.event_type());
        }
    }

    #[tokio::test]
    async fn test_spawn_observer_drains_in_order() {
        let bus = aigenflow_application::EventBus::new();
        let recorder = Arc::new(Recorder(StdMutex::new(Vec::new())));
        let handle = spawn_observer(recorder.clone(), bus.subscribe());

        bus.publish(PipelineEvent::PipelineResumed {
            session_id: "s".to_string(),
            from_phase: 2,
            timestamp: Utc::now(),
        });
        bus.publish(PipelineEvent::PipelineCompleted {
            session_id: "s".to_string(),
            phase_count: 5,
            timestamp: Utc::now(),
        });
        drop(bus);
        handle.await.unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["pipeline_resumed", "pipeline_completed"]
        );
    }

    #[test]
    fn test_reporter_tracks_phase_bar() {
        let reporter = ProgressReporter::new();
        reporter.multi.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        reporter.on_event(&PipelineEvent::PhaseStarted {
            session_id: "s".to_string(),
            phase: 1,
            name: "Framing".to_string(),
            providers: vec![ProviderKind::ChatGpt, ProviderKind::Claude],
            timestamp: Utc::now(),
        });
        reporter.on_event(&PipelineEvent::AgentResponded {
            session_id: "s".to_string(),
            phase: 1,
            task: PhaseTask::BrainstormChatGpt,
            provider: ProviderKind::ChatGpt,
            success: true,
            latency_ms: 10,
            error: None,
            timestamp: Utc::now(),
        });
        assert_eq!(reporter.bar().as_ref().map(|pb| pb.position()), Some(1));

        reporter.on_event(&PipelineEvent::PhaseCompleted {
            session_id: "s".to_string(),
            phase: 1,
            name: "Framing".to_string(),
            providers: vec![ProviderKind::ChatGpt, ProviderKind::Claude],
            response_count: 2,
            timestamp: Utc::now(),
        });
        assert!(reporter.bar().is_none());
    }
}
