//! Gateway tuning from TOML (`[retry]`, `[recovery]` and `[routing]` sections)

use super::ConfigValidationError;
use aigenflow_application::{RecoveryConfig, RetryPolicy};
use aigenflow_domain::{PhaseTask, ProviderKind, RouteEntry, RoutingTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Retry policy against the primary provider of a task.
///
/// `attempts` includes the first call; backoff doubles from
/// `base_delay_ms` up to `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl FileRetryConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.attempts == 0 {
            return Err(ConfigValidationError::ZeroAttempts);
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigValidationError::InvalidValue {
                field: "retry.max_delay_ms".to_string(),
                message: format!("must be at least base_delay_ms ({})", self.base_delay_ms),
            });
        }
        Ok(())
    }

    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// Session recovery timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecoveryConfig {
    pub refresh_timeout_secs: u64,
    pub login_timeout_secs: u64,
    /// Allow the interactive login stage (disable for unattended runs)
    pub interactive_login: bool,
    /// Re-check a valid session once its last validation is this old
    pub validation_ttl_secs: u64,
}

impl Default for FileRecoveryConfig {
    fn default() -> Self {
        let config = RecoveryConfig::default();
        Self {
            refresh_timeout_secs: config.refresh_timeout.as_secs(),
            login_timeout_secs: config.login_timeout.as_secs(),
            interactive_login: config.interactive_login,
            validation_ttl_secs: config.validation_ttl.as_secs(),
        }
    }
}

impl FileRecoveryConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.refresh_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout("recovery.refresh_timeout_secs"));
        }
        if self.login_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout("recovery.login_timeout_secs"));
        }
        Ok(())
    }

    pub fn to_recovery_config(&self) -> RecoveryConfig {
        RecoveryConfig::default()
            .with_refresh_timeout(Duration::from_secs(self.refresh_timeout_secs))
            .with_login_timeout(Duration::from_secs(self.login_timeout_secs))
            .with_interactive_login(self.interactive_login)
            .with_validation_ttl(Duration::from_secs(self.validation_ttl_secs))
    }
}

/// Route override for one task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRouteConfig {
    /// Defaults to the task's built-in provider
    pub primary: Option<String>,
    pub fallbacks: Vec<String>,
}

/// Routing overrides.
///
/// # Example
///
/// ```toml
/// [routing]
/// safety_net = "claude"
///
/// [routing.tasks.deep_search_gemini]
/// primary = "gemini"
/// fallbacks = ["claude", "chatgpt"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoutingConfig {
    pub safety_net: String,
    /// Keyed by task name (e.g. `swot_chatgpt`)
    pub tasks: BTreeMap<String, FileRouteConfig>,
}

impl Default for FileRoutingConfig {
    fn default() -> Self {
        Self {
            safety_net: RoutingTable::default().safety_net().as_str().to_string(),
            tasks: BTreeMap::new(),
        }
    }
}

impl FileRoutingConfig {
    /// Build the routing table: built-in defaults with the overrides applied.
    pub fn to_routing_table(&self) -> Result<RoutingTable, ConfigValidationError> {
        let safety_net = parse_provider("routing.safety_net", &self.safety_net)?;
        let mut table = RoutingTable::with_defaults(safety_net);

        for (name, route) in &self.tasks {
            let task = name
                .parse::<PhaseTask>()
                .map_err(|_| ConfigValidationError::UnknownTask(name.clone()))?;
            let field = format!("routing.tasks.{name}");
            let primary = match &route.primary {
                Some(p) => parse_provider(&field, p)?,
                None => task.default_provider(),
            };
            let fallbacks = route
                .fallbacks
                .iter()
                .map(|f| parse_provider(&field, f))
                .collect::<Result<Vec<_>, _>>()?;
            table = table.with_route(task, RouteEntry::new(primary, fallbacks));
        }

        if let Some(problem) = table.validate().into_iter().next() {
            return Err(ConfigValidationError::InvalidValue {
                field: "routing".to_string(),
                message: problem,
            });
        }
        Ok(table)
    }
}

fn parse_provider(field: &str, value: &str) -> Result<ProviderKind, ConfigValidationError> {
    value
        .parse::<ProviderKind>()
        .map_err(|_| ConfigValidationError::UnknownProvider {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults_match_policy() {
        let config = FileRetryConfig::default();
        assert_eq!(config.attempts, 2);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.to_retry_policy().delay_for(2), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_max_below_base() {
        let config = FileRetryConfig {
            base_delay_ms: 5000,
            max_delay_ms: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_route_primary_defaults_to_task_provider() {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            "polish_claude".to_string(),
            FileRouteConfig {
                primary: None,
                fallbacks: vec!["openai".to_string()],
            },
        );
        let config = FileRoutingConfig {
            tasks,
            ..Default::default()
        };
        let table = config.to_routing_table().unwrap();
        let route = table.route(PhaseTask::PolishClaude);
        assert_eq!(route.primary, ProviderKind::Claude);
        assert_eq!(route.fallbacks, vec![ProviderKind::ChatGpt]);
    }

    #[test]
    fn test_route_fallback_equal_to_primary_is_rejected() {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            "charts_gemini".to_string(),
            FileRouteConfig {
                primary: Some("gemini".to_string()),
                fallbacks: vec!["gemini".to_string()],
            },
        );
        let config = FileRoutingConfig {
            tasks,
            ..Default::default()
        };
        assert!(matches!(
            config.to_routing_table(),
            Err(ConfigValidationError::InvalidValue { field, .. }) if field == "routing"
        ));
    }

    #[test]
    fn test_unknown_safety_net() {
        let config = FileRoutingConfig {
            safety_net: "llama".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.to_routing_table(),
            Err(ConfigValidationError::UnknownProvider { value, .. }) if value == "llama"
        ));
    }
}
