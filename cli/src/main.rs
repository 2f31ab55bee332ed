//! CLI entrypoint for aigenflow
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use aigenflow_application::{
    AgentRouter, EventBus, PipelineOrchestrator, PipelineSettings, SessionManager, default_phases,
};
use aigenflow_domain::{PipelineError, PipelineSession};
use aigenflow_infrastructure::{
    ConfigLoader, FileConfig, FileCredentialStore, JsonPipelineStore, JsonlEventLogger,
    TruncatingSummarizer, build_adapters,
};
use aigenflow_presentation::{
    Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter, spawn_observer,
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How long observers get to drain the event channel on exit
const OBSERVER_DRAIN: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        println!("Configuration sources (highest priority last):");
        for (label, path, found) in ConfigLoader::config_sources() {
            let status = if found { "found" } else { "not found" };
            println!("  {label:<8} {path} ({status})");
        }
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // Load configuration
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {e}"))?
    };
    let settings = config.to_settings().context("Invalid configuration")?;

    let _log_guard = init_logging(cli.verbose, config.logging.file.as_deref())?;
    info!("Starting aigenflow");

    // Observers subscribe before anything publishes
    let events = EventBus::new();
    let mut observers: Vec<JoinHandle<()>> = Vec::new();
    if !cli.quiet {
        observers.push(spawn_observer(
            Arc::new(ProgressReporter::new()),
            events.subscribe(),
        ));
    }
    if config.logging.events {
        let logger = JsonlEventLogger::new(config.storage.state_dir());
        observers.push(logger.spawn(events.subscribe()));
    }

    // Ctrl-C aborts the phase in progress; the session stays resumable
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, aborting the current phase");
            token.cancel();
        }
    });

    let outcome = execute(command, cli.output, &config, settings, &events, cancel).await;

    drop(events);
    for handle in observers {
        if tokio::time::timeout(OBSERVER_DRAIN, handle).await.is_err() {
            warn!("Event observer did not finish in time");
        }
    }
    outcome
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Initialize logging based on verbosity level, RUST_LOG when not given
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Could not create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Everything a command needs, wired from configuration
struct Services {
    sessions: Arc<SessionManager>,
    orchestrator: PipelineOrchestrator,
}

fn wire(
    config: &FileConfig,
    settings: PipelineSettings,
    events: &EventBus,
    cancel: CancellationToken,
) -> Services {
    // === Dependency Injection ===
    let credentials = Arc::new(FileCredentialStore::new(config.storage.credentials_dir()));
    let sessions = Arc::new(
        SessionManager::new(build_adapters(config), credentials, settings.recovery)
            .with_events(events.clone()),
    );
    let router = Arc::new(
        AgentRouter::new(sessions.clone(), settings.routing, settings.retry)
            .with_events(events.clone()),
    );
    let store = Arc::new(JsonPipelineStore::new(config.storage.state_dir()));
    let orchestrator = PipelineOrchestrator::new(router, store, default_phases())
        .with_summarizer(Arc::new(TruncatingSummarizer::new()))
        .with_context_settings(settings.context)
        .with_events(events.clone())
        .with_cancellation(cancel);

    Services {
        sessions,
        orchestrator,
    }
}

async fn execute(
    command: Command,
    output: OutputFormat,
    config: &FileConfig,
    settings: PipelineSettings,
    events: &EventBus,
    cancel: CancellationToken,
) -> Result<()> {
    let services = wire(config, settings, events, cancel);
    let orchestrator = &services.orchestrator;

    match command {
        Command::Run(args) => {
            let pipeline = args.apply_to(config.pipeline_config(&args.topic)?);
            let outcome = orchestrator.run(pipeline).await;
            report(orchestrator, output, outcome).await
        }
        Command::Resume {
            session_id,
            from_phase,
        } => {
            let outcome = orchestrator.resume(&session_id, from_phase).await;
            report(orchestrator, output, outcome).await
        }
        Command::Status {
            session_id: Some(id),
        } => {
            let session = orchestrator.status(&id).await?;
            println!("{}", render(&session, output));
            Ok(())
        }
        Command::Status { session_id: None } => {
            let sessions = orchestrator.list().await?;
            print!("{}", ConsoleFormatter::format_sessions(&sessions));
            Ok(())
        }
        Command::Check => {
            let statuses = services.sessions.check_all().await;
            print!("{}", ConsoleFormatter::format_providers(&statuses));
            if statuses.iter().any(|s| !s.state.is_valid()) {
                bail!("Some provider sessions are not valid; run `aigenflow relogin <provider>`");
            }
            Ok(())
        }
        Command::Relogin { provider } => {
            services
                .sessions
                .relogin(provider)
                .await
                .with_context(|| format!("Login to {} failed", provider.display_name()))?;
            println!("{} session saved.", provider.display_name());
            Ok(())
        }
    }
}

/// Print the final state of a run, including a failed one, then surface the error.
async fn report(
    orchestrator: &PipelineOrchestrator,
    output: OutputFormat,
    outcome: Result<PipelineSession, PipelineError>,
) -> Result<()> {
    match outcome {
        Ok(session) => {
            println!("{}", render(&session, output));
            Ok(())
        }
        Err(err) => {
            if let Some(id) = err.session_id()
                && let Ok(session) = orchestrator.status(id).await
            {
                println!("{}", render(&session, output));
            }
            Err(err.into())
        }
    }
}

fn render(session: &PipelineSession, output: OutputFormat) -> String {
    match output {
        OutputFormat::Full => ConsoleFormatter::format(session),
        OutputFormat::Summary => ConsoleFormatter::format_summary(session),
        OutputFormat::Json => ConsoleFormatter::format_json(session),
    }
}
