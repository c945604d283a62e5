use crate::domain::tour::model::{GeocodedStop, Location, Tour, TranscriptSegment};
use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Persistence port for the tour pipeline. Each method is one independent
/// checkpoint; the status-bearing writes carry their own status guards so a
/// stale task can never move a tour backward.
#[async_trait]
pub trait TourStore: Send + Sync {
    async fn insert(&self, tour: &Tour) -> AppResult<()>;

    async fn find_for_owner(&self, tour_id: Uuid, user_id: Uuid) -> AppResult<Option<Tour>>;

    async fn list_for_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Tour>>;

    /// Persist generated title/content and advance `generating → content_ready`
    async fn save_content(
        &self,
        tour_id: Uuid,
        title: &str,
        content: &str,
        llm_provider: &str,
        llm_model: &str,
        generation_params: &JsonValue,
    ) -> AppResult<()>;

    /// Persist the resolved stops aggregate. Does not touch status.
    async fn save_stops(
        &self,
        tour_id: Uuid,
        stops: &[GeocodedStop],
        total_distance: f64,
        walking_time_minutes: f64,
        difficulty: &str,
    ) -> AppResult<()>;

    /// Persist audio URL and transcript and advance to `ready`
    async fn finalize(
        &self,
        tour_id: Uuid,
        audio_url: Option<&str>,
        transcript: &[TranscriptSegment],
    ) -> AppResult<()>;

    /// Move a non-terminal tour to `error` with a short reason
    async fn set_error(&self, tour_id: Uuid, reason: &str) -> AppResult<()>;

    /// Record the audio URL only when none is stored yet
    async fn set_audio_url_if_absent(&self, tour_id: Uuid, audio_url: &str) -> AppResult<()>;

    async fn delete(&self, tour_id: Uuid) -> AppResult<()>;
}

/// Read port for anchor locations
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn find_by_id(&self, location_id: Uuid) -> AppResult<Option<Location>>;
}

/// Write port for per-user usage accounting
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn record(
        &self,
        user_id: Uuid,
        provider: &str,
        tokens: i64,
        estimated_cost: f64,
    ) -> AppResult<()>;
}
