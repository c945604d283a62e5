use super::error::ContentGenerationError;
use super::ProviderId;
use crate::domain::tour::model::{Location, StopCandidate};
use crate::infrastructure::cache::{self, Cache};
use crate::infrastructure::providers::ContentProvider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const MAX_TOKENS: u16 = 2000;
const TEMPERATURE: f32 = 0.7;

/// Interests beyond the first three add prompt tokens without changing the
/// narrative much
const MAX_PROMPT_INTERESTS: usize = 3;

/// Rough estimate: 1 token per 4 characters of prompt text
const CHARS_PER_TOKEN: usize = 4;

/// Expected output volume per requested tour minute
const OUTPUT_TOKENS_PER_MINUTE: i64 = 50;

const SYSTEM_PROMPT: &str = "You are an expert travel guide. Create engaging audio tour content. \
     Return only valid JSON with 'title' and 'content' fields.";

/// Parameters for one content generation
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub location: Location,
    pub interests: Vec<String>,
    pub duration_minutes: i32,
    pub language: String,
    pub narration_style: String,
    pub preferred_provider: ProviderId,
}

/// Provenance recorded alongside generated content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub actual_provider: ProviderId,
    pub original_provider: ProviderId,
    pub model: String,
    pub fallback_used: bool,
    #[serde(default)]
    pub cache_hit: bool,
    pub generated_at: DateTime<Utc>,
    pub location_id: Uuid,
    pub duration_minutes: i32,
    pub interests: Vec<String>,
    pub language: String,
    pub narration_style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub stops: Vec<StopCandidate>,
    pub metadata: GenerationMetadata,
}

impl GeneratedContent {
    /// Unit count for usage accounting (1 token per 4 characters)
    pub fn estimated_tokens(&self) -> i64 {
        ((self.content.len() + self.title.len()) / CHARS_PER_TOKEN) as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub estimated_cost: f64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub provider: ProviderId,
    pub cached: bool,
}

/// Price per 1k tokens, averaged over input/output rates
pub fn cost_per_1k_tokens(provider: ProviderId) -> f64 {
    match provider {
        ProviderId::OpenAi => 0.000765,
        ProviderId::Anthropic => 0.001375,
    }
}

/// Content Generator: token-minimized prompting, deterministic cache keys,
/// response-shape repair, and single-step provider fallback.
pub struct ContentService {
    openai: Arc<dyn ContentProvider>,
    anthropic: Arc<dyn ContentProvider>,
    cache: Arc<dyn Cache>,
    content_ttl: Duration,
}

impl ContentService {
    pub fn new(
        openai: Arc<dyn ContentProvider>,
        anthropic: Arc<dyn ContentProvider>,
        cache: Arc<dyn Cache>,
        content_ttl: Duration,
    ) -> Self {
        Self {
            openai,
            anthropic,
            cache,
            content_ttl,
        }
    }

    fn provider(&self, id: ProviderId) -> &dyn ContentProvider {
        match id {
            ProviderId::OpenAi => self.openai.as_ref(),
            ProviderId::Anthropic => self.anthropic.as_ref(),
        }
    }

    /// Generate tour content, trying the preferred provider and then its
    /// fallback exactly once each. Fails only when both fail.
    pub async fn generate(
        &self,
        request: &ContentRequest,
    ) -> Result<GeneratedContent, ContentGenerationError> {
        let cache_key = content_cache_key(request);

        if let Some(mut cached) =
            cache::get_json::<GeneratedContent>(self.cache.as_ref(), &cache_key).await
        {
            tracing::info!(
                location_id = %request.location.id,
                provider = %request.preferred_provider,
                "Tour content cache hit"
            );
            cached.metadata.cache_hit = true;
            return Ok(cached);
        }

        // Ordered candidates, evaluated left to right; first success wins
        let order = [
            request.preferred_provider,
            request.preferred_provider.fallback(),
        ];
        let mut errors: Vec<String> = Vec::new();

        for (attempt, provider_id) in order.into_iter().enumerate() {
            match self.generate_with(provider_id, request).await {
                Ok(mut content) => {
                    if attempt > 0 {
                        tracing::warn!(
                            original = %request.preferred_provider,
                            actual = %provider_id,
                            "Content generated via fallback provider"
                        );
                        content.metadata.fallback_used = true;
                    }

                    cache::set_json(self.cache.as_ref(), &cache_key, &content, self.content_ttl)
                        .await;
                    return Ok(content);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %provider_id,
                        error = %e,
                        "Content provider failed"
                    );
                    errors.push(e);
                }
            }
        }

        Err(ContentGenerationError::BothProvidersFailed {
            primary_provider: order[0],
            primary_error: errors.first().cloned().unwrap_or_default(),
            fallback_provider: order[1],
            fallback_error: errors.get(1).cloned().unwrap_or_default(),
        })
    }

    async fn generate_with(
        &self,
        provider_id: ProviderId,
        request: &ContentRequest,
    ) -> Result<GeneratedContent, String> {
        let prompt = build_prompt(request);
        let provider = self.provider(provider_id);

        let raw = provider
            .generate(SYSTEM_PROMPT, &prompt, MAX_TOKENS, TEMPERATURE)
            .await
            .map_err(|e| format!("provider {} failed: {}", provider_id, e))?;

        let (title, content, stops) = parse_tour_response(&raw)
            .map_err(|e| format!("provider {} returned unusable response: {}", provider_id, e))?;

        Ok(GeneratedContent {
            title,
            content,
            stops,
            metadata: GenerationMetadata {
                actual_provider: provider_id,
                original_provider: request.preferred_provider,
                model: provider.model().to_string(),
                fallback_used: false,
                cache_hit: false,
                generated_at: Utc::now(),
                location_id: request.location.id,
                duration_minutes: request.duration_minutes,
                interests: request.interests.clone(),
                language: request.language.clone(),
                narration_style: request.narration_style.clone(),
            },
        })
    }

    /// Pure cost estimate; a cache hit costs nothing
    pub async fn estimate(&self, request: &ContentRequest) -> CostEstimate {
        let cache_key = content_cache_key(request);
        if self.cache.get(&cache_key).await.is_some() {
            return CostEstimate {
                estimated_cost: 0.0,
                input_tokens: 0,
                output_tokens: 0,
                provider: request.preferred_provider,
                cached: true,
            };
        }

        let prompt = build_prompt(request);
        estimate_cost(prompt.len(), request.duration_minutes, request.preferred_provider)
    }
}

/// Deterministic cost estimate from prompt size and requested duration
pub fn estimate_cost(prompt_len: usize, duration_minutes: i32, provider: ProviderId) -> CostEstimate {
    let input_tokens = (prompt_len / CHARS_PER_TOKEN) as i64;
    let output_tokens = duration_minutes as i64 * OUTPUT_TOKENS_PER_MINUTE;
    let estimated_cost =
        (input_tokens + output_tokens) as f64 / 1000.0 * cost_per_1k_tokens(provider);

    CostEstimate {
        estimated_cost,
        input_tokens,
        output_tokens,
        provider,
        cached: false,
    }
}

/// Deterministic cache key: interests are sorted so that input order never
/// causes a miss for semantically identical requests
pub fn content_cache_key(request: &ContentRequest) -> String {
    let mut interests = request.interests.clone();
    interests.sort();

    let payload = serde_json::json!({
        "location_id": request.location.id,
        "location_name": request.location.name,
        "interests": interests,
        "duration": request.duration_minutes,
        "language": request.language,
        "style": request.narration_style,
        "provider": request.preferred_provider,
    });

    // serde_json maps are key-ordered, so the serialized form is canonical
    let digest = Sha256::digest(payload.to_string().as_bytes());
    format!("tour:content:{}", hex_string(&digest))
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Token-optimized prompt asking for a strict JSON object
fn build_prompt(request: &ContentRequest) -> String {
    let interests_text = if request.interests.is_empty() {
        "history,culture".to_string()
    } else {
        request
            .interests
            .iter()
            .take(MAX_PROMPT_INTERESTS)
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    };

    let city = request.location.city.as_deref().unwrap_or("");

    format!(
        "Create {duration}min audio tour for {name}, {city}.\n\
         Focus: {interests}\n\
         Language: {language}\n\
         Style: {style}\n\n\
         Return JSON:\n\
         {{\"title\": \"engaging title\", \"content\": \"{style} {duration}-minute narration script with clear sections\", \
         \"walkable_stops\": [{{\"name\": \"stop name\", \"description\": \"one sentence\", \
         \"approximate_address\": \"street or landmark\", \"highlights\": [\"short phrase\"]}}]}}\n\n\
         Requirements:\n\
         - Conversational audio style\n\
         - {duration} minutes of content\n\
         - Include fascinating facts and stories\n\
         - Clear section transitions\n\
         - 3-6 walkable_stops within a short walk of each other\n\
         - Engaging for all ages",
        duration = request.duration_minutes,
        name = request.location.name,
        city = city,
        interests = interests_text,
        language = request.language,
        style = request.narration_style,
    )
}

/// Parse the provider response as JSON; tolerate prose or markdown wrapping
/// by recovering the outermost brace-delimited object.
fn parse_tour_response(raw: &str) -> Result<(String, String, Vec<StopCandidate>), String> {
    if let Ok(value) = serde_json::from_str::<JsonValue>(raw) {
        if let Some(parsed) = extract_tour_fields(&value) {
            return Ok(parsed);
        }
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<JsonValue>(&raw[start..=end]) {
                if let Some(parsed) = extract_tour_fields(&value) {
                    return Ok(parsed);
                }
            }
        }
    }

    Err("no JSON object with title and content found".to_string())
}

fn extract_tour_fields(value: &JsonValue) -> Option<(String, String, Vec<StopCandidate>)> {
    let object = value.as_object()?;
    let title = object.get("title")?.as_str()?.trim().to_string();
    let content = object.get("content")?.as_str()?.trim().to_string();

    if title.is_empty() || content.is_empty() {
        return None;
    }

    // Invalid stop entries are skipped, not fatal
    let stops = object
        .get("walkable_stops")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value::<StopCandidate>(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    Some((title, content, stops))
}
