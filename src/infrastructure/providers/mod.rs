pub mod anthropic_content_provider;
pub mod content_provider;
pub mod geocoding_provider;
pub mod speech_provider;

pub use anthropic_content_provider::AnthropicContentProvider;
pub use content_provider::{ContentProvider, OpenAiContentProvider};
pub use geocoding_provider::{GeocodingProvider, NominatimClient};
pub use speech_provider::{OpenAiSpeechProvider, SpeechProvider};

/// Vendor-call failures shared by the content provider implementations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider API error: {0}")]
    Api(String),
    #[error("provider returned an invalid response: {0}")]
    InvalidResponse(String),
}
