//! Provider value object identifying an external conversational-AI service

use serde::{Deserialize, Serialize};

/// External AI services the pipeline can delegate work to (Value Object)
///
/// Each variant is reachable only through its own session-based channel;
/// the identity is what session state and credentials are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    ChatGpt,
    Claude,
    Gemini,
    Perplexity,
}

impl ProviderKind {
    /// All providers, in a stable order
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::ChatGpt,
        ProviderKind::Claude,
        ProviderKind::Gemini,
        ProviderKind::Perplexity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ChatGpt => "chatgpt",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Perplexity => "perplexity",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::ChatGpt => "ChatGPT",
            ProviderKind::Claude => "Claude",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Perplexity => "Perplexity",
        }
    }

    /// Whether the provider is search-oriented rather than large-context.
    ///
    /// Fallback ordering prefers large-context providers first.
    pub fn is_search_oriented(&self) -> bool {
        matches!(self, ProviderKind::Perplexity)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a provider name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}' (expected one of: chatgpt, claude, gemini, perplexity)")]
pub struct UnknownProvider(pub String);

impl std::str::FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chatgpt" | "openai" => Ok(ProviderKind::ChatGpt),
            "claude" => Ok(ProviderKind::Claude),
            "gemini" => Ok(ProviderKind::Gemini),
            "perplexity" => Ok(ProviderKind::Perplexity),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}
