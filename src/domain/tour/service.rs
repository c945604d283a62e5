use super::model::{Location, Tour, TourStatus, PLACEHOLDER_CONTENT};
use super::transcript::{estimate_audio_duration, generate_transcript_segments};
use super::{CostEstimateResponse, TourGenerationRequest, TourStatusResponse};
use crate::domain::content::service::cost_per_1k_tokens;
use crate::domain::content::{ContentRequest, ContentService, ProviderId};
use crate::domain::route::{difficulty_for_distance, validate_feasibility, RouteService};
use crate::domain::speech::{truncate_to_sentence, SpeechService, CHUNK_THRESHOLD};
use crate::error::{AppError, AppResult};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::repositories::{LocationStore, TourStore, UsageStore};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Error reasons are persisted into a bounded column
const MAX_ERROR_REASON_LEN: usize = 255;

/// Rough audio pricing used only for up-front estimates
const AUDIO_CHARS_PER_MINUTE: f64 = 200.0;
const AUDIO_COST_PER_1K_CHARS: f64 = 0.015;

/// Pipeline knobs sourced from [`Config`](crate::infrastructure::config::Config)
pub struct TourPipelineSettings {
    pub api_base_url: String,
    pub default_provider: ProviderId,
    pub default_voice: String,
    pub tts_speed: f32,
    pub audio_ttl: Duration,
    pub content_timeout: Duration,
    pub synthesis_timeout: Duration,
    pub synthesis_timeout_chunked: Duration,
}

/// Orchestrates the generation pipeline and owns the tour read/mutate
/// surface. Generation runs as a detached background task per tour; clients
/// follow it through the status endpoint.
pub struct TourService {
    tours: Arc<dyn TourStore>,
    locations: Arc<dyn LocationStore>,
    usage: Arc<dyn UsageStore>,
    content: Arc<ContentService>,
    speech: Arc<SpeechService>,
    route: Arc<RouteService>,
    cache: Arc<dyn Cache>,
    settings: TourPipelineSettings,
}

impl TourService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tours: Arc<dyn TourStore>,
        locations: Arc<dyn LocationStore>,
        usage: Arc<dyn UsageStore>,
        content: Arc<ContentService>,
        speech: Arc<SpeechService>,
        route: Arc<RouteService>,
        cache: Arc<dyn Cache>,
        settings: TourPipelineSettings,
    ) -> Self {
        Self {
            tours,
            locations,
            usage,
            content,
            speech,
            route,
            cache,
            settings,
        }
    }

    /// Create the tour row in `generating` state and kick off the background
    /// pipeline. Returns immediately with the placeholder record.
    pub async fn start_generation(
        self: &Arc<Self>,
        user_id: Uuid,
        request: TourGenerationRequest,
    ) -> AppResult<Tour> {
        let location = self
            .locations
            .find_by_id(request.location_id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(format!("Location {} not found", request.location_id))
            })?;

        let tour = Tour::new_generating(user_id, &request);
        self.tours.insert(&tour).await?;

        tracing::info!(
            tour_id = %tour.id,
            location_name = %location.name,
            duration_minutes = request.duration_minutes,
            "Tour generation started"
        );

        let service = Arc::clone(self);
        let tour_id = tour.id;
        tokio::spawn(async move {
            service.run_generation(tour_id, user_id, location, request).await;
        });

        Ok(tour)
    }

    /// Background entry point. Absorbs every outcome; the tour row always
    /// leaves `generating` when this returns.
    async fn run_generation(
        &self,
        tour_id: Uuid,
        user_id: Uuid,
        location: Location,
        request: TourGenerationRequest,
    ) {
        if let Err(err) = self.generate(tour_id, user_id, &location, &request).await {
            tracing::error!(tour_id = %tour_id, error = %err, "Tour generation failed");
            let reason = truncate_reason(&format!("Generation failed: {}", err));
            if let Err(update_err) = self.tours.set_error(tour_id, &reason).await {
                tracing::error!(
                    tour_id = %tour_id,
                    error = %update_err,
                    "Failed to mark tour as errored"
                );
            }
        }
    }

    async fn generate(
        &self,
        tour_id: Uuid,
        user_id: Uuid,
        location: &Location,
        request: &TourGenerationRequest,
    ) -> AppResult<()> {
        // Stage 1: narrative content. The only fatal stage.
        let content_request = ContentRequest {
            location: location.clone(),
            interests: request.interests.clone(),
            duration_minutes: request.duration_minutes,
            language: request.language.clone(),
            narration_style: request.narration_style.clone(),
            preferred_provider: self.settings.default_provider,
        };

        let generated = match tokio::time::timeout(
            self.settings.content_timeout,
            self.content.generate(&content_request),
        )
        .await
        {
            Ok(Ok(generated)) => generated,
            Ok(Err(err)) => {
                tracing::error!(tour_id = %tour_id, error = %err, "Content generation failed");
                let reason = truncate_reason(&format!("LLM error: {}", err));
                self.tours.set_error(tour_id, &reason).await?;
                return Ok(());
            }
            Err(_) => {
                tracing::error!(
                    tour_id = %tour_id,
                    timeout_secs = self.settings.content_timeout.as_secs(),
                    "Content generation timed out"
                );
                self.tours
                    .set_error(tour_id, "LLM error: content generation timed out")
                    .await?;
                return Ok(());
            }
        };

        tracing::info!(
            tour_id = %tour_id,
            content_length = generated.content.len(),
            provider = %generated.metadata.actual_provider,
            model = %generated.metadata.model,
            cache_hit = generated.metadata.cache_hit,
            "Content generated"
        );

        let generation_params =
            serde_json::to_value(&generated.metadata).unwrap_or(JsonValue::Null);
        self.tours
            .save_content(
                tour_id,
                &generated.title,
                &generated.content,
                &generated.metadata.actual_provider.to_string(),
                &generated.metadata.model,
                &generation_params,
            )
            .await?;

        // Usage accounting. Cache hits cost nothing.
        let tokens = generated.estimated_tokens();
        let cost = if generated.metadata.cache_hit {
            0.0
        } else {
            tokens as f64 / 1000.0 * cost_per_1k_tokens(generated.metadata.actual_provider)
        };
        if let Err(err) = self
            .usage
            .record(
                user_id,
                &generated.metadata.actual_provider.to_string(),
                tokens,
                cost,
            )
            .await
        {
            tracing::warn!(tour_id = %tour_id, error = %err, "Failed to record usage");
        }

        // Stage 2: walkable stops. Best effort end to end.
        if generated.stops.is_empty() {
            tracing::info!(tour_id = %tour_id, "No walkable stops in generated content");
        } else {
            let stops = self.route.resolve_stops(&generated.stops, location).await;
            if stops.is_empty() {
                tracing::warn!(tour_id = %tour_id, "No stop candidates could be geocoded");
            } else {
                let legs: Vec<f64> =
                    stops.iter().map(|s| s.distance_from_previous).collect();
                let summary = validate_feasibility(&legs);
                if !summary.is_feasible {
                    tracing::warn!(
                        tour_id = %tour_id,
                        total_distance = summary.total_distance,
                        max_leg_distance = summary.max_leg_distance,
                        "Route exceeds walking bounds, keeping stops anyway"
                    );
                }

                let difficulty = difficulty_for_distance(summary.total_distance);
                if let Err(err) = self
                    .tours
                    .save_stops(
                        tour_id,
                        &stops,
                        summary.total_distance,
                        summary.estimated_walking_time_minutes,
                        difficulty,
                    )
                    .await
                {
                    tracing::error!(tour_id = %tour_id, error = %err, "Failed to save stops");
                }
            }
        }

        // Stage 3: audio. A timeout or provider failure yields a text-only
        // tour, never an error status.
        let voice = request
            .voice
            .clone()
            .unwrap_or_else(|| self.settings.default_voice.clone());
        let timeout = if generated.content.len() > CHUNK_THRESHOLD {
            self.settings.synthesis_timeout_chunked
        } else {
            self.settings.synthesis_timeout
        };

        let audio = match tokio::time::timeout(
            timeout,
            self.speech
                .synthesize(&generated.content, &voice, self.settings.tts_speed),
        )
        .await
        {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(err)) => {
                tracing::error!(
                    tour_id = %tour_id,
                    error = %err,
                    "Speech synthesis failed, proceeding without audio"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    tour_id = %tour_id,
                    timeout_secs = timeout.as_secs(),
                    "Speech synthesis timed out, proceeding without audio"
                );
                None
            }
        };

        let audio_url = match audio {
            Some(bytes) => {
                tracing::info!(tour_id = %tour_id, audio_size = bytes.len(), "Caching tour audio");
                self.cache
                    .set(&tour_audio_key(tour_id), bytes, self.settings.audio_ttl)
                    .await;
                Some(self.audio_url(tour_id))
            }
            None => None,
        };

        // Stage 4: transcript timing from the text alone
        let estimated_duration = estimate_audio_duration(&generated.content);
        let transcript = generate_transcript_segments(&generated.content, estimated_duration);

        self.tours
            .finalize(tour_id, audio_url.as_deref(), &transcript)
            .await?;

        tracing::info!(
            tour_id = %tour_id,
            has_audio = audio_url.is_some(),
            transcript_segments = transcript.len(),
            "Tour generation completed"
        );

        Ok(())
    }

    pub async fn get_tour(&self, user_id: Uuid, tour_id: Uuid) -> AppResult<Tour> {
        self.tours
            .find_for_owner(tour_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tour {} not found", tour_id)))
    }

    pub async fn list_tours(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Tour>> {
        self.tours.list_for_owner(user_id, limit, offset).await
    }

    pub async fn get_status(&self, user_id: Uuid, tour_id: Uuid) -> AppResult<TourStatusResponse> {
        let tour = self.get_tour(user_id, tour_id).await?;
        Ok(TourStatusResponse {
            tour_id: tour.id,
            status: tour.status,
            title: tour.title,
            progress: tour.status.progress_percent(),
            has_audio: tour.audio_url.is_some(),
            created_at: tour.created_at,
            updated_at: tour.updated_at,
        })
    }

    /// Fetch the synthesized audio. On a cache miss the audio is
    /// re-synthesized from the stored content, so expired cache entries heal
    /// on first access.
    pub async fn get_audio(&self, user_id: Uuid, tour_id: Uuid) -> AppResult<Vec<u8>> {
        let tour = self.get_tour(user_id, tour_id).await?;

        if !matches!(tour.status, TourStatus::Ready | TourStatus::ContentReady) {
            return Err(AppError::Conflict(format!(
                "Tour is not ready (status: {})",
                tour.status
            )));
        }

        let key = tour_audio_key(tour_id);
        if let Some(bytes) = self.cache.get(&key).await {
            return Ok(bytes);
        }

        if tour.content.is_empty() || tour.content == PLACEHOLDER_CONTENT {
            return Err(AppError::NotFound(
                "Audio not available for this tour".to_string(),
            ));
        }

        tracing::info!(tour_id = %tour_id, "Audio missing from cache, re-synthesizing");
        self.synthesize_and_store(&tour).await
    }

    /// Re-synthesize audio from the stored content on user request
    pub async fn regenerate_audio(&self, user_id: Uuid, tour_id: Uuid) -> AppResult<()> {
        let tour = self.get_tour(user_id, tour_id).await?;

        if tour.content.is_empty() || tour.content == PLACEHOLDER_CONTENT {
            return Err(AppError::Conflict(
                "Tour has no content to generate audio from".to_string(),
            ));
        }

        self.synthesize_and_store(&tour).await?;
        Ok(())
    }

    async fn synthesize_and_store(&self, tour: &Tour) -> AppResult<Vec<u8>> {
        let text = truncate_to_sentence(&tour.content, CHUNK_THRESHOLD);
        let voice = tour
            .voice
            .clone()
            .unwrap_or_else(|| self.settings.default_voice.clone());

        let bytes = self
            .speech
            .synthesize(&text, &voice, self.settings.tts_speed)
            .await?;

        self.cache
            .set(&tour_audio_key(tour.id), bytes.clone(), self.settings.audio_ttl)
            .await;
        self.tours
            .set_audio_url_if_absent(tour.id, &self.audio_url(tour.id))
            .await?;

        Ok(bytes)
    }

    pub async fn delete_tour(&self, user_id: Uuid, tour_id: Uuid) -> AppResult<()> {
        // Ownership check before any side effect
        self.get_tour(user_id, tour_id).await?;

        self.cache.delete(&tour_audio_key(tour_id)).await;
        self.tours.delete(tour_id).await?;

        tracing::info!(tour_id = %tour_id, user_id = %user_id, "Tour deleted");
        Ok(())
    }

    /// Up-front cost estimate for the given parameters, content plus audio
    pub async fn estimate_cost(
        &self,
        request: &TourGenerationRequest,
    ) -> AppResult<CostEstimateResponse> {
        let location = self
            .locations
            .find_by_id(request.location_id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(format!("Location {} not found", request.location_id))
            })?;

        let content_request = ContentRequest {
            location,
            interests: request.interests.clone(),
            duration_minutes: request.duration_minutes,
            language: request.language.clone(),
            narration_style: request.narration_style.clone(),
            preferred_provider: self.settings.default_provider,
        };

        let estimate = self.content.estimate(&content_request).await;

        let estimated_chars = request.duration_minutes as f64 * AUDIO_CHARS_PER_MINUTE;
        let audio_cost = estimated_chars / 1000.0 * AUDIO_COST_PER_1K_CHARS;

        Ok(CostEstimateResponse {
            provider: estimate.provider.to_string(),
            input_tokens: estimate.input_tokens,
            output_tokens: estimate.output_tokens,
            estimated_content_cost: round4(estimate.estimated_cost),
            estimated_audio_cost: round4(audio_cost),
            estimated_total_cost: round4(estimate.estimated_cost + audio_cost),
            cached: estimate.cached,
        })
    }

    fn audio_url(&self, tour_id: Uuid) -> String {
        format!("{}/api/tours/{}/audio", self.settings.api_base_url, tour_id)
    }
}

pub fn tour_audio_key(tour_id: Uuid) -> String {
    format!("audio:tour:{}", tour_id)
}

/// Char-boundary-safe truncation for the persisted error reason
fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_ERROR_REASON_LEN {
        return reason.to_string();
    }
    let mut end = MAX_ERROR_REASON_LEN;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
