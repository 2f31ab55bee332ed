//! Context budget from TOML (`[context]` section)

use super::ConfigValidationError;
use aigenflow_domain::ContextSettings;
use serde::{Deserialize, Serialize};

/// Controls how much of the earlier phases is carried into the next prompt.
///
/// # Example
///
/// ```toml
/// [context]
/// summarize_threshold_bytes = 24000
/// target_ratio = 0.5
/// preview_chars = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileContextConfig {
    /// Summarize once the rendered chain exceeds this many bytes
    pub summarize_threshold_bytes: usize,
    /// Size of the summary relative to the input
    pub target_ratio: f64,
    /// Characters kept per response in the chain
    pub preview_chars: usize,
}

impl Default for FileContextConfig {
    fn default() -> Self {
        let settings = ContextSettings::default();
        Self {
            summarize_threshold_bytes: settings.summarize_threshold_bytes(),
            target_ratio: settings.target_ratio(),
            preview_chars: settings.preview_chars(),
        }
    }
}

impl FileContextConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.target_ratio > 0.0 && self.target_ratio < 1.0) {
            return Err(ConfigValidationError::InvalidRatio(self.target_ratio));
        }
        if let Some(problem) = self.to_context_settings().validate().into_iter().next() {
            return Err(ConfigValidationError::InvalidValue {
                field: "context".to_string(),
                message: problem,
            });
        }
        Ok(())
    }

    pub fn to_context_settings(&self) -> ContextSettings {
        ContextSettings::new(
            self.summarize_threshold_bytes,
            self.target_ratio,
            self.preview_chars,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_config_default() {
        let config = FileContextConfig::default();
        assert_eq!(config.summarize_threshold_bytes, 24_000);
        assert_eq!(config.preview_chars, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_context_missing_uses_defaults() {
        let config: super::super::FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.context, FileContextConfig::default());
    }
}
