pub mod model;
pub mod service;
pub mod transcript;

pub use model::{
    GeocodedStop, Location, StopCandidate, Tour, TourStatus, TranscriptSegment,
};
pub use service::TourService;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_duration_minutes() -> i32 {
    30
}

fn default_language() -> String {
    "en".to_string()
}

fn default_narration_style() -> String {
    "conversational".to_string()
}

/// Payload for starting a tour generation (and for cost estimates)
#[derive(Debug, Clone, Deserialize)]
pub struct TourGenerationRequest {
    pub location_id: Uuid,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_narration_style")]
    pub narration_style: String,
    #[serde(default)]
    pub voice: Option<String>,
}

/// Lightweight polling view of a tour's pipeline progress
#[derive(Debug, Clone, Serialize)]
pub struct TourStatusResponse {
    pub tour_id: Uuid,
    pub status: TourStatus,
    pub title: String,
    pub progress: u8,
    pub has_audio: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Up-front cost estimate covering both content and audio generation
#[derive(Debug, Clone, Serialize)]
pub struct CostEstimateResponse {
    pub provider: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub estimated_content_cost: f64,
    pub estimated_audio_cost: f64,
    pub estimated_total_cost: f64,
    pub cached: bool,
}
