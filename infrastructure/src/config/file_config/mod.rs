//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Names (providers, tasks, phases) stay strings here and are parsed into
//! domain types by [`FileConfig::validate`] and the conversion methods.

mod context;
mod gateway;
mod pipeline;
mod providers;

pub use context::FileContextConfig;
pub use gateway::{FileRecoveryConfig, FileRetryConfig, FileRouteConfig, FileRoutingConfig};
pub use pipeline::FilePipelineConfig;
pub use providers::{FileLoggingConfig, FileProviderConfig, FileStorageConfig};

use aigenflow_application::PipelineSettings;
use aigenflow_domain::{PipelineConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("retry.attempts cannot be 0")]
    ZeroAttempts,

    #[error("{0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("context.target_ratio must be between 0 and 1 (got {0})")]
    InvalidRatio(f64),

    #[error("{field}: unknown provider '{value}'")]
    UnknownProvider { field: String, value: String },

    #[error("routing.tasks: unknown task '{0}'")]
    UnknownTask(String),

    #[error("pipeline.phases: {0}")]
    InvalidPhase(String),

    #[error("pipeline.phases cannot be empty")]
    EmptyPhases,

    #[error("pipeline.phases lists '{0}' more than once")]
    DuplicatePhase(String),

    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Run defaults (document type, language, phases)
    pub pipeline: FilePipelineConfig,
    /// Retry policy against a task's primary provider
    pub retry: FileRetryConfig,
    /// Session recovery timeouts
    pub recovery: FileRecoveryConfig,
    /// Cross-phase context budget
    pub context: FileContextConfig,
    /// Routing overrides
    pub routing: FileRoutingConfig,
    /// Bridge command per provider, keyed by provider name
    pub providers: BTreeMap<String, FileProviderConfig>,
    /// Where sessions and credentials live
    pub storage: FileStorageConfig,
    /// Log file settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.pipeline.validate()?;
        self.retry.validate()?;
        self.recovery.validate()?;
        self.context.validate()?;
        self.routing.to_routing_table()?;

        for (name, provider) in &self.providers {
            name.parse::<ProviderKind>()
                .map_err(|_| ConfigValidationError::UnknownProvider {
                    field: "providers".to_string(),
                    value: name.clone(),
                })?;
            provider.validate(name)?;
        }
        Ok(())
    }

    /// Settings for the orchestrator, router and session manager
    pub fn to_settings(&self) -> Result<PipelineSettings, ConfigValidationError> {
        self.validate()?;
        Ok(PipelineSettings {
            retry: self.retry.to_retry_policy(),
            recovery: self.recovery.to_recovery_config(),
            context: self.context.to_context_settings(),
            routing: self.routing.to_routing_table()?,
        })
    }

    /// Run configuration for `topic` with this file's defaults applied
    pub fn pipeline_config(&self, topic: &str) -> Result<PipelineConfig, ConfigValidationError> {
        self.pipeline.to_pipeline_config(topic)
    }

    /// Bridge settings for `kind`, falling back to the defaults.
    ///
    /// The shared bridge without explicit args still gets `--provider <kind>`.
    pub fn provider(&self, kind: ProviderKind) -> FileProviderConfig {
        let defaults = FileProviderConfig::for_provider(kind);
        match self.providers.get(kind.as_str()) {
            Some(configured) if configured.args.is_empty() && configured.command == defaults.command => {
                FileProviderConfig {
                    args: defaults.args,
                    ..configured.clone()
                }
            }
            Some(configured) => configured.clone(),
            None => defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigenflow_domain::{DocumentType, PhaseKind, PhaseTask};
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[pipeline]
language = "en"
doc_type = "rd"
phases = ["framing", "research"]

[retry]
attempts = 3
base_delay_ms = 500

[recovery]
login_timeout_secs = 60
interactive_login = false

[context]
summarize_threshold_bytes = 12000
target_ratio = 0.25

[routing]
safety_net = "gemini"

[routing.tasks.deep_search_gemini]
fallbacks = ["claude", "chatgpt"]

[providers.claude]
command = "/opt/bridge/claude"
args = ["--headless"]
timeout_secs = 90

[storage]
state_dir = "runs"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.pipeline.language, "en");
        assert_eq!(config.retry.attempts, 3);
        assert!(!config.recovery.interactive_login);
        assert_eq!(config.storage.state_dir.to_string_lossy(), "runs");

        let settings = config.to_settings().unwrap();
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.retry.base_delay, Duration::from_millis(500));
        assert_eq!(settings.recovery.login_timeout, Duration::from_secs(60));
        assert_eq!(settings.context.summarize_threshold_bytes(), 12000);
        assert_eq!(settings.routing.safety_net(), ProviderKind::Gemini);
        let route = settings.routing.route(PhaseTask::DeepSearchGemini);
        assert_eq!(route.primary, ProviderKind::Gemini);
        assert_eq!(route.fallbacks, vec![ProviderKind::Claude, ProviderKind::ChatGpt]);

        let claude = config.provider(ProviderKind::Claude);
        assert_eq!(claude.command, "/opt/bridge/claude");
        assert_eq!(claude.timeout_secs, 90);

        let run = config.pipeline_config("Next-generation battery recycling").unwrap();
        assert_eq!(run.doc_type(), DocumentType::Rd);
        assert_eq!(run.phases(), &[PhaseKind::Framing, PhaseKind::Research]);
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        let settings = config.to_settings().unwrap();
        assert_eq!(settings.retry.attempts, 2);
        assert_eq!(settings.recovery.login_timeout, Duration::from_secs(120));
        assert_eq!(settings.routing.safety_net(), ProviderKind::Claude);

        let gemini = config.provider(ProviderKind::Gemini);
        assert_eq!(gemini.command, "aigenflow-bridge");
        assert_eq!(gemini.args, vec!["--provider", "gemini"]);
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config: FileConfig = toml::from_str("[retry]\nattempts = 0\n").unwrap();
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroAttempts));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config: FileConfig = toml::from_str("[recovery]\nrefresh_timeout_secs = 0\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroTimeout("recovery.refresh_timeout_secs"))
        );
    }

    #[test]
    fn test_validate_ratio_bounds() {
        for ratio in ["0.0", "1.0", "1.5"] {
            let config: FileConfig =
                toml::from_str(&format!("[context]\ntarget_ratio = {ratio}\n")).unwrap();
            assert!(matches!(
                config.validate(),
                Err(ConfigValidationError::InvalidRatio(_))
            ));
        }
    }

    #[test]
    fn test_validate_unknown_provider_section() {
        let config: FileConfig = toml::from_str("[providers.bard]\ncommand = \"x\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::UnknownProvider { value, .. }) if value == "bard"
        ));
    }

    #[test]
    fn test_validate_unknown_task() {
        let config: FileConfig =
            toml::from_str("[routing.tasks.summon_llama]\nprimary = \"claude\"\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::UnknownTask("summon_llama".to_string()))
        );
    }

    #[test]
    fn test_validate_duplicate_phase() {
        let config: FileConfig =
            toml::from_str("[pipeline]\nphases = [\"framing\", \"framing\"]\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicatePhase("framing".to_string()))
        );
    }

    #[test]
    fn test_validate_empty_phases() {
        let config: FileConfig = toml::from_str("[pipeline]\nphases = []\n").unwrap();
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyPhases));
    }
}
