//! Run defaults from TOML (`[pipeline]` section)

use super::ConfigValidationError;
use aigenflow_domain::{DocumentType, PhaseKind, PipelineConfig, TemplateType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Defaults applied to every `run` unless overridden on the command line.
///
/// # Example
///
/// ```toml
/// [pipeline]
/// language = "ko"
/// doc_type = "bizplan"
/// template = "default"
/// output_dir = "output"
/// phases = ["framing", "research", "strategy", "writing", "review"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    pub language: String,
    pub doc_type: String,
    pub template: String,
    pub output_dir: PathBuf,
    pub phases: Vec<String>,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        Self {
            language: "ko".to_string(),
            doc_type: DocumentType::default().as_str().to_string(),
            template: TemplateType::default().as_str().to_string(),
            output_dir: PathBuf::from("output"),
            phases: PhaseKind::ALL.iter().map(|p| p.as_str().to_string()).collect(),
        }
    }
}

impl FilePipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.parse_phases()?;
        self.doc_type
            .parse::<DocumentType>()
            .map_err(|e| invalid("pipeline.doc_type", e))?;
        self.template
            .parse::<TemplateType>()
            .map_err(|e| invalid("pipeline.template", e))?;
        if self.language.trim().is_empty() {
            return Err(invalid("pipeline.language", "cannot be empty"));
        }
        Ok(())
    }

    /// Phase names parsed in file order
    pub fn parse_phases(&self) -> Result<Vec<PhaseKind>, ConfigValidationError> {
        if self.phases.is_empty() {
            return Err(ConfigValidationError::EmptyPhases);
        }
        let mut parsed: Vec<PhaseKind> = Vec::with_capacity(self.phases.len());
        for name in &self.phases {
            let phase = name
                .parse::<PhaseKind>()
                .map_err(ConfigValidationError::InvalidPhase)?;
            if parsed.contains(&phase) {
                return Err(ConfigValidationError::DuplicatePhase(name.clone()));
            }
            parsed.push(phase);
        }
        Ok(parsed)
    }

    pub fn to_pipeline_config(&self, topic: &str) -> Result<PipelineConfig, ConfigValidationError> {
        self.validate()?;
        let doc_type = self
            .doc_type
            .parse::<DocumentType>()
            .map_err(|e| invalid("pipeline.doc_type", e))?;
        let template = self
            .template
            .parse::<TemplateType>()
            .map_err(|e| invalid("pipeline.template", e))?;
        Ok(PipelineConfig::new(topic)
            .with_doc_type(doc_type)
            .with_template(template)
            .with_language(self.language.clone())
            .with_output_dir(self.output_dir.clone())
            .with_phases(self.parse_phases()?))
    }
}

fn invalid(field: &str, message: impl ToString) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lists_all_phases() {
        let config = FilePipelineConfig::default();
        assert_eq!(config.parse_phases().unwrap(), PhaseKind::ALL.to_vec());
        assert_eq!(config.doc_type, "bizplan");
    }

    #[test]
    fn test_unknown_phase() {
        let config = FilePipelineConfig {
            phases: vec!["framing".to_string(), "marketing".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidPhase(_))
        ));
    }

    #[test]
    fn test_unknown_doc_type() {
        let config = FilePipelineConfig {
            doc_type: "novel".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidValue { field, .. }) if field == "pipeline.doc_type"
        ));
    }
}
