use crate::error::AppError;

/// Synthesis failures are reported as values; the orchestrator treats them
/// as non-fatal and continues without audio.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("speech provider error: {0}")]
    Provider(String),
    #[error("text exceeds provider limit: {length} > {limit}")]
    TextTooLong { length: usize, limit: usize },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SynthesisError> for AppError {
    fn from(err: SynthesisError) -> Self {
        AppError::ExternalService(err.to_string())
    }
}
