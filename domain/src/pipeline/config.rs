//! Immutable run parameters

use crate::core::error::ConfigError;
use crate::pipeline::phase::PhaseKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Minimum topic length, in characters
pub const MIN_TOPIC_CHARS: usize = 10;

/// Kind of document the pipeline produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Business plan
    #[default]
    Bizplan,
    /// Research and development proposal
    Rd,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Bizplan => "bizplan",
            DocumentType::Rd => "rd",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bizplan" => Ok(DocumentType::Bizplan),
            "rd" => Ok(DocumentType::Rd),
            other => Err(ConfigError::UnknownDocumentType(other.to_string())),
        }
    }
}

/// Prompt template family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    #[default]
    Default,
    Startup,
    Strategy,
    Rd,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Default => "default",
            TemplateType::Startup => "startup",
            TemplateType::Strategy => "strategy",
            TemplateType::Rd => "rd",
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemplateType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(TemplateType::Default),
            "startup" => Ok(TemplateType::Startup),
            "strategy" => Ok(TemplateType::Strategy),
            "rd" => Ok(TemplateType::Rd),
            other => Err(ConfigError::UnknownTemplate(other.to_string())),
        }
    }
}

/// Run parameters, fixed when the run starts (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    topic: String,
    doc_type: DocumentType,
    template: TemplateType,
    language: String,
    output_dir: PathBuf,
    phases: Vec<PhaseKind>,
}

impl PipelineConfig {
    /// Full five-phase run with default document settings
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            doc_type: DocumentType::default(),
            template: TemplateType::default(),
            language: "ko".to_string(),
            output_dir: PathBuf::from("output"),
            phases: PhaseKind::ALL.to_vec(),
        }
    }

    pub fn with_doc_type(mut self, doc_type: DocumentType) -> Self {
        self.doc_type = doc_type;
        self
    }

    pub fn with_template(mut self, template: TemplateType) -> Self {
        self.template = template;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_phases(mut self, phases: Vec<PhaseKind>) -> Self {
        self.phases = phases;
        self
    }

    // ==================== Accessors ====================

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    pub fn template(&self) -> TemplateType {
        self.template
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn phases(&self) -> &[PhaseKind] {
        &self.phases
    }

    /// Number of configured phases (N in `PHASE_1..PHASE_N`)
    pub fn phase_count(&self) -> u8 {
        self.phases.len().min(u8::MAX as usize) as u8
    }

    /// Phase kind at the 1-based position `number`
    pub fn phase_at(&self, number: u8) -> Option<PhaseKind> {
        if number == 0 {
            return None;
        }
        self.phases.get(number as usize - 1).copied()
    }

    /// Validate the configuration.
    ///
    /// Phases may be a subset of the five, but must follow pipeline order
    /// without duplicates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chars = self.topic.trim().chars().count();
        if chars < MIN_TOPIC_CHARS {
            return Err(ConfigError::TopicTooShort {
                min: MIN_TOPIC_CHARS,
                actual: chars,
            });
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::EmptyLanguage);
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }
        if self.phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if self.phases[..i].contains(phase) {
                return Err(ConfigError::DuplicatePhase(*phase));
            }
            if let Some(prev) = i.checked_sub(1).map(|j| self.phases[j])
                && *phase < prev
            {
                return Err(ConfigError::PhaseOrder {
                    earlier: *phase,
                    later: prev,
                });
            }
        }
        Ok(())
    }
}
