//! CLI command definitions

use aigenflow_domain::{DocumentType, PhaseKind, PipelineConfig, ProviderKind, TemplateType};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for pipeline results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every phase with its provider calls
    Full,
    /// Session state and phase list only
    Summary,
    /// Persisted session as JSON
    Json,
}

/// CLI arguments for aigenflow
#[derive(Parser, Debug)]
#[command(name = "aigenflow")]
#[command(author, version, about = "Multi-AI pipeline that turns a topic into a business or R&D plan")]
#[command(long_about = r#"
aigenflow walks a topic through five phases, delegating each task to
ChatGPT, Claude, Gemini or Perplexity through their web sessions:

1. Framing:  brainstorm and validate the idea
2. Research: deep search and fact checking
3. Strategy: SWOT analysis and narrative
4. Writing:  plan draft, outline and charts
5. Review:   verification, final review and polish

State is saved after every phase, so a failed run can be resumed.

Configuration files are loaded from (in priority order):
1. --config <path>                      Explicit config file
2. ./aigenflow.toml                     Project-level config
3. ~/.config/aigenflow/config.toml      Global config

Example:
  aigenflow run "AI-based crop disease detection for smart farms"
  aigenflow run --doc-type rd --language en "Solid-state battery recycling"
  aigenflow resume 3f2c9a1e-... --from-phase 3
  aigenflow status
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format for the final report
    #[arg(short, long, value_enum, default_value = "summary", global = true)]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new pipeline run for a topic
    Run(RunArgs),

    /// Continue a failed or interrupted run
    Resume {
        /// Session id printed when the run started
        session_id: String,

        /// Re-run from this phase (defaults to the first incomplete one)
        #[arg(long, value_name = "N")]
        from_phase: Option<u8>,
    },

    /// Show one run in detail, or list all runs
    Status {
        session_id: Option<String>,
    },

    /// Validate every provider session
    Check,

    /// Discard a provider's stored session and log in again
    Relogin {
        /// chatgpt, claude, gemini or perplexity
        provider: ProviderKind,
    },
}

/// Arguments of `aigenflow run`. Unset options keep the configured defaults.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// What the document is about
    pub topic: String,

    /// Document type (bizplan, rd)
    #[arg(long, value_name = "TYPE")]
    pub doc_type: Option<DocumentType>,

    /// Template (default, startup, strategy, rd)
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<TemplateType>,

    /// Output language code
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Phases to run, comma separated, in pipeline order
    #[arg(long, value_name = "PHASE", value_delimiter = ',')]
    pub phases: Vec<PhaseKind>,

    /// Directory for run state and generated documents
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Overlay the command-line options on `config`
    pub fn apply_to(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(doc_type) = self.doc_type {
            config = config.with_doc_type(doc_type);
        }
        if let Some(template) = self.template {
            config = config.with_template(template);
        }
        if let Some(language) = &self.language {
            config = config.with_language(language.clone());
        }
        if !self.phases.is_empty() {
            config = config.with_phases(self.phases.clone());
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir.clone());
        }
        config
    }
}
