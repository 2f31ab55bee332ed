//! Provider bridges, storage and logging from TOML
//! (`[providers.<name>]`, `[storage]` and `[logging]` sections)

use super::ConfigValidationError;
use aigenflow_domain::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bridge executable, looked up on `PATH`
pub const DEFAULT_BRIDGE_COMMAND: &str = "aigenflow-bridge";

/// External bridge process for one provider.
///
/// # Example
///
/// ```toml
/// [providers.claude]
/// command = "aigenflow-bridge"
/// args = ["--provider", "claude"]
/// timeout_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Register this provider at all
    pub enabled: bool,
    pub command: String,
    /// Arguments placed before the subcommand
    pub args: Vec<String>,
    /// Bound on one `send` round trip
    pub timeout_secs: u64,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: DEFAULT_BRIDGE_COMMAND.to_string(),
            args: Vec::new(),
            timeout_secs: 120,
        }
    }
}

impl FileProviderConfig {
    /// Defaults for `kind`: the shared bridge with `--provider <kind>`
    pub fn for_provider(kind: ProviderKind) -> Self {
        Self {
            args: vec!["--provider".to_string(), kind.as_str().to_string()],
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigValidationError> {
        if self.command.trim().is_empty() {
            return Err(ConfigValidationError::InvalidValue {
                field: format!("providers.{name}.command"),
                message: "cannot be empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout("providers.<name>.timeout_secs"));
        }
        Ok(())
    }
}

/// Storage locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Root for `<session_id>/pipeline_state.json` and event logs
    pub state_dir: PathBuf,
    /// Root for per-provider credential directories (`~` is expanded)
    pub credentials_dir: PathBuf,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("output"),
            credentials_dir: PathBuf::from("~/.aigenflow/profiles"),
        }
    }
}

impl FileStorageConfig {
    pub fn state_dir(&self) -> PathBuf {
        expand_home(&self.state_dir)
    }

    pub fn credentials_dir(&self) -> PathBuf {
        expand_home(&self.credentials_dir)
    }
}

/// Log file settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Also write tracing output to this file
    pub file: Option<PathBuf>,
    /// Append every pipeline event to `<state_dir>/<session_id>/events.jsonl`
    pub events: bool,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            events: true,
        }
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
