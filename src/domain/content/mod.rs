pub mod error;
pub mod service;

pub use error::ContentGenerationError;
pub use service::{ContentRequest, ContentService, CostEstimate, GeneratedContent, GenerationMetadata};

use serde::{Deserialize, Serialize};

/// The closed set of content-generation vendors. Adding a vendor means
/// adding a variant and a `ContentProvider` implementation, not branching on
/// string identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
}

impl ProviderId {
    /// The provider tried when this one fails
    pub fn fallback(&self) -> ProviderId {
        match self {
            ProviderId::OpenAi => ProviderId::Anthropic,
            ProviderId::Anthropic => ProviderId::OpenAi,
        }
    }

    pub fn from_str_or_default(value: &str) -> ProviderId {
        match value {
            "anthropic" => ProviderId::Anthropic,
            _ => ProviderId::OpenAi,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::OpenAi => write!(f, "openai"),
            ProviderId::Anthropic => write!(f, "anthropic"),
        }
    }
}
