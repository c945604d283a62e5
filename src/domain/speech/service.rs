use super::chunking::{chunk_text, CHUNK_THRESHOLD};
use super::error::SynthesisError;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::providers::SpeechProvider;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Speech Generator: chunks text that exceeds the provider limit, stitches
/// the returned audio back together in order, and caches whole-text results
/// so the same narration is never synthesized twice.
pub struct SpeechService {
    provider: Arc<dyn SpeechProvider>,
    cache: Arc<dyn Cache>,
    audio_ttl: Duration,
}

impl SpeechService {
    pub fn new(provider: Arc<dyn SpeechProvider>, cache: Arc<dyn Cache>, audio_ttl: Duration) -> Self {
        Self {
            provider,
            cache,
            audio_ttl,
        }
    }

    /// Synthesize `text` with the given voice and speed. Long text is split
    /// into boundary-respecting chunks synthesized sequentially; the byte
    /// streams are concatenated in order with no re-encoding.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Vec<u8>, SynthesisError> {
        let cache_key = audio_cache_key(text, voice, speed, self.provider.model());

        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::info!(
                audio_size = cached.len(),
                voice = voice,
                "Audio cache hit"
            );
            return Ok(cached);
        }

        let start_time = std::time::Instant::now();

        let audio = if text.len() <= CHUNK_THRESHOLD {
            self.provider.synthesize(text, voice, speed).await?
        } else {
            let chunk_limit = CHUNK_THRESHOLD.min(self.provider.max_text_len());
            let chunks = chunk_text(text, chunk_limit);
            tracing::info!(
                chunk_count = chunks.len(),
                text_length = text.len(),
                "Long narration split for synthesis"
            );
            self.synthesize_chunks(&chunks, voice, speed).await?
        };

        tracing::info!(
            voice = voice,
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.len(),
            audio_size_bytes = audio.len(),
            "Speech synthesis completed"
        );

        // Cache the full-text result, not per-chunk pieces
        self.cache.set(&cache_key, audio.clone(), self.audio_ttl).await;

        Ok(audio)
    }

    async fn synthesize_chunks(
        &self,
        chunks: &[String],
        voice: &str,
        speed: f32,
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut merged_audio = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!(
                chunk_index = index,
                chunk_size = chunk.len(),
                "Synthesizing chunk"
            );

            let audio = self.provider.synthesize(chunk, voice, speed).await?;
            merged_audio.extend(audio);
        }

        Ok(merged_audio)
    }
}

/// Whole-text cache key over a hash of the text plus every parameter that
/// changes the audio
pub fn audio_cache_key(text: &str, voice: &str, speed: f32, model: &str) -> String {
    let text_digest = Sha256::digest(text.as_bytes());
    let text_hash: String = text_digest.iter().map(|b| format!("{:02x}", b)).collect();

    let payload = serde_json::json!({
        "text_hash": text_hash,
        "voice": voice,
        "speed": speed,
        "model": model,
    });

    let digest = Sha256::digest(payload.to_string().as_bytes());
    let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("audio:tts:{}", hash)
}
