use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Placeholder values satisfying the minimum-length constraints while the
/// background task runs
pub const PLACEHOLDER_TITLE: &str = "Generating...";
pub const PLACEHOLDER_CONTENT: &str = "Tour content is being generated. Please wait...";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TourStatus {
    Generating,
    ContentReady,
    Ready,
    Error,
}

impl TourStatus {
    /// Fixed progress mapping reported to polling clients
    pub fn progress_percent(&self) -> u8 {
        match self {
            TourStatus::Generating => 50,
            TourStatus::ContentReady => 80,
            TourStatus::Ready => 100,
            TourStatus::Error => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TourStatus::Ready | TourStatus::Error)
    }

    /// Status only moves forward through the pipeline, or to `Error` from any
    /// non-terminal state. Never backward.
    pub fn can_advance_to(&self, next: TourStatus) -> bool {
        match (self, next) {
            (TourStatus::Generating, TourStatus::ContentReady) => true,
            (TourStatus::Generating, TourStatus::Ready) => true,
            (TourStatus::ContentReady, TourStatus::Ready) => true,
            (current, TourStatus::Error) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for TourStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TourStatus::Generating => write!(f, "generating"),
            TourStatus::ContentReady => write!(f, "content_ready"),
            TourStatus::Ready => write!(f, "ready"),
            TourStatus::Error => write!(f, "error"),
        }
    }
}

/// A transcript segment with estimated playback timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(rename = "startTime")]
    pub start_time: f64,
    #[serde(rename = "endTime")]
    pub end_time: f64,
    pub text: String,
}

/// A stop candidate extracted from generated narrative, before geocoding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub approximate_address: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// A stop resolved to real-world coordinates. Candidates that fail to
/// geocode are dropped before persistence; every persisted stop carries
/// valid coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodedStop {
    pub name: String,
    pub description: String,
    pub approximate_address: String,
    pub highlights: Vec<String>,
    pub order_index: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub geocoding_accuracy: String,
    /// Meters from the previous resolved stop (or the tour anchor for the
    /// first stop)
    pub distance_from_previous: f64,
}

/// Anchor location a tour is generated for
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// The persisted tour record. Mutated only by its owning background task
/// after creation, plus the user-triggered audio regeneration path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tour {
    pub id: Uuid,
    pub user_id: Uuid,
    pub location_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub audio_url: Option<String>,
    pub transcript: Json<Vec<TranscriptSegment>>,
    pub duration_minutes: i32,
    pub interests: Vec<String>,
    pub language: String,
    pub narration_style: String,
    pub voice: Option<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub generation_params: JsonValue,
    pub walkable_stops: Json<Vec<GeocodedStop>>,
    pub total_walking_distance: Option<f64>,
    pub estimated_walking_time: Option<f64>,
    pub difficulty_level: Option<String>,
    pub status: TourStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    /// Build a fresh record in `generating` state for synchronous creation
    pub fn new_generating(user_id: Uuid, request: &super::TourGenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            location_id: request.location_id,
            title: PLACEHOLDER_TITLE.to_string(),
            description: None,
            content: PLACEHOLDER_CONTENT.to_string(),
            audio_url: None,
            transcript: Json(Vec::new()),
            duration_minutes: request.duration_minutes,
            interests: request.interests.clone(),
            language: request.language.clone(),
            narration_style: request.narration_style.clone(),
            voice: request.voice.clone(),
            llm_provider: None,
            llm_model: None,
            generation_params: JsonValue::Null,
            walkable_stops: Json(Vec::new()),
            total_walking_distance: None,
            estimated_walking_time: None,
            difficulty_level: None,
            status: TourStatus::Generating,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_mapping() {
        assert_eq!(TourStatus::Generating.progress_percent(), 50);
        assert_eq!(TourStatus::ContentReady.progress_percent(), 80);
        assert_eq!(TourStatus::Ready.progress_percent(), 100);
        assert_eq!(TourStatus::Error.progress_percent(), 0);
    }

    #[test]
    fn test_status_never_regresses() {
        assert!(!TourStatus::ContentReady.can_advance_to(TourStatus::Generating));
        assert!(!TourStatus::Ready.can_advance_to(TourStatus::ContentReady));
        assert!(!TourStatus::Ready.can_advance_to(TourStatus::Generating));
    }

    #[test]
    fn test_error_is_terminal() {
        assert!(!TourStatus::Error.can_advance_to(TourStatus::Ready));
        assert!(!TourStatus::Error.can_advance_to(TourStatus::Error));
        assert!(TourStatus::ContentReady.can_advance_to(TourStatus::Error));
        assert!(TourStatus::Generating.can_advance_to(TourStatus::Error));
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(TourStatus::Generating.can_advance_to(TourStatus::ContentReady));
        assert!(TourStatus::ContentReady.can_advance_to(TourStatus::Ready));
    }

    #[test]
    fn test_transcript_segment_serializes_camel_case() {
        let segment = TranscriptSegment {
            start_time: 0.0,
            end_time: 2.5,
            text: "Welcome".to_string(),
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert!(json.get("startTime").is_some());
        assert!(json.get("endTime").is_some());
    }
}
