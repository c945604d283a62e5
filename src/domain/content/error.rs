use super::ProviderId;
use crate::error::AppError;

/// Raised only when both providers fail; fatal to the tour
#[derive(Debug, thiserror::Error)]
pub enum ContentGenerationError {
    #[error("content generation failed with both providers: {primary_provider} ({primary_error}), {fallback_provider} ({fallback_error})")]
    BothProvidersFailed {
        primary_provider: ProviderId,
        primary_error: String,
        fallback_provider: ProviderId,
        fallback_error: String,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ContentGenerationError> for AppError {
    fn from(err: ContentGenerationError) -> Self {
        AppError::ExternalService(err.to_string())
    }
}
