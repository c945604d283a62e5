use crate::domain::speech::SynthesisError;
use async_openai::{
    config::OpenAIConfig,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI rejects speech inputs above 4096 characters
const MAX_INPUT_LEN: usize = 4096;

/// Port for TTS vendors. One call synthesizes one length-limited text; the
/// speech service handles chunking above the limit.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Vec<u8>, SynthesisError>;

    fn model(&self) -> &str;

    fn max_text_len(&self) -> usize;
}

/// OpenAI TTS implementation
pub struct OpenAiSpeechProvider {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiSpeechProvider {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

fn parse_voice(voice: &str) -> Voice {
    match voice.to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Alloy,
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeechProvider {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Vec<u8>, SynthesisError> {
        if text.len() > MAX_INPUT_LEN {
            return Err(SynthesisError::TextTooLong {
                length: text.len(),
                limit: MAX_INPUT_LEN,
            });
        }

        tracing::debug!(
            model = %self.model,
            voice = voice,
            text_length = text.len(),
            "Calling OpenAI TTS API"
        );

        let request = CreateSpeechRequest {
            model: self.speech_model(),
            input: text.to_string(),
            voice: parse_voice(voice),
            response_format: None, // Defaults to MP3
            speed: Some(speed),
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                model = %self.model,
                voice = voice,
                text_length = text.len(),
                error = %e,
                "OpenAI TTS API call failed"
            );
            SynthesisError::Provider(format!("OpenAI TTS error: {}", e))
        })?;

        Ok(response.bytes.to_vec())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_text_len(&self) -> usize {
        MAX_INPUT_LEN
    }
}
