//! End-to-end pipeline tests driving the real `TourService` against
//! in-memory ports: no database, no network, no vendor SDK calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use strollcast_backend::domain::content::{ContentService, ProviderId};
use strollcast_backend::domain::route::{GeoPoint, GeocodingError, RouteService};
use strollcast_backend::domain::speech::{SpeechService, SynthesisError};
use strollcast_backend::domain::tour::model::{
    GeocodedStop, Location, Tour, TourStatus, TranscriptSegment,
};
use strollcast_backend::domain::tour::service::TourPipelineSettings;
use strollcast_backend::domain::tour::transcript::estimate_audio_duration;
use strollcast_backend::domain::tour::{TourGenerationRequest, TourService};
use strollcast_backend::error::{AppError, AppResult};
use strollcast_backend::infrastructure::cache::{Cache, MemoryCache};
use strollcast_backend::infrastructure::providers::{
    ContentProvider, GeocodingProvider, ProviderError, SpeechProvider,
};
use strollcast_backend::infrastructure::repositories::{LocationStore, TourStore, UsageStore};

// ---------------------------------------------------------------------------
// In-memory ports

#[derive(Default)]
struct FakeTourStore {
    tours: Mutex<HashMap<Uuid, Tour>>,
}

#[async_trait]
impl TourStore for FakeTourStore {
    async fn insert(&self, tour: &Tour) -> AppResult<()> {
        self.tours.lock().unwrap().insert(tour.id, tour.clone());
        Ok(())
    }

    async fn find_for_owner(&self, tour_id: Uuid, user_id: Uuid) -> AppResult<Option<Tour>> {
        Ok(self
            .tours
            .lock()
            .unwrap()
            .get(&tour_id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn list_for_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Tour>> {
        let mut tours: Vec<Tour> = self
            .tours
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tours.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tours
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn save_content(
        &self,
        tour_id: Uuid,
        title: &str,
        content: &str,
        llm_provider: &str,
        llm_model: &str,
        generation_params: &serde_json::Value,
    ) -> AppResult<()> {
        let mut tours = self.tours.lock().unwrap();
        if let Some(tour) = tours.get_mut(&tour_id) {
            if tour.status == TourStatus::Generating {
                tour.title = title.to_string();
                tour.content = content.to_string();
                tour.llm_provider = Some(llm_provider.to_string());
                tour.llm_model = Some(llm_model.to_string());
                tour.generation_params = generation_params.clone();
                tour.status = TourStatus::ContentReady;
            }
        }
        Ok(())
    }

    async fn save_stops(
        &self,
        tour_id: Uuid,
        stops: &[GeocodedStop],
        total_distance: f64,
        walking_time_minutes: f64,
        difficulty: &str,
    ) -> AppResult<()> {
        let mut tours = self.tours.lock().unwrap();
        if let Some(tour) = tours.get_mut(&tour_id) {
            tour.walkable_stops = sqlx::types::Json(stops.to_vec());
            tour.total_walking_distance = Some(total_distance);
            tour.estimated_walking_time = Some(walking_time_minutes);
            tour.difficulty_level = Some(difficulty.to_string());
        }
        Ok(())
    }

    async fn finalize(
        &self,
        tour_id: Uuid,
        audio_url: Option<&str>,
        transcript: &[TranscriptSegment],
    ) -> AppResult<()> {
        let mut tours = self.tours.lock().unwrap();
        if let Some(tour) = tours.get_mut(&tour_id) {
            if matches!(tour.status, TourStatus::Generating | TourStatus::ContentReady) {
                tour.audio_url = audio_url.map(str::to_string);
                tour.transcript = sqlx::types::Json(transcript.to_vec());
                tour.status = TourStatus::Ready;
            }
        }
        Ok(())
    }

    async fn set_error(&self, tour_id: Uuid, reason: &str) -> AppResult<()> {
        let mut tours = self.tours.lock().unwrap();
        if let Some(tour) = tours.get_mut(&tour_id) {
            if !tour.status.is_terminal() {
                tour.status = TourStatus::Error;
                tour.description = Some(reason.to_string());
            }
        }
        Ok(())
    }

    async fn set_audio_url_if_absent(&self, tour_id: Uuid, audio_url: &str) -> AppResult<()> {
        let mut tours = self.tours.lock().unwrap();
        if let Some(tour) = tours.get_mut(&tour_id) {
            if tour.audio_url.is_none() {
                tour.audio_url = Some(audio_url.to_string());
            }
        }
        Ok(())
    }

    async fn delete(&self, tour_id: Uuid) -> AppResult<()> {
        self.tours.lock().unwrap().remove(&tour_id);
        Ok(())
    }
}

struct FakeLocationStore {
    locations: HashMap<Uuid, Location>,
}

#[async_trait]
impl LocationStore for FakeLocationStore {
    async fn find_by_id(&self, location_id: Uuid) -> AppResult<Option<Location>> {
        Ok(self.locations.get(&location_id).cloned())
    }
}

#[derive(Default)]
struct FakeUsageStore {
    records: Mutex<Vec<(Uuid, String, i64, f64)>>,
}

#[async_trait]
impl UsageStore for FakeUsageStore {
    async fn record(
        &self,
        user_id: Uuid,
        provider: &str,
        tokens: i64,
        estimated_cost: f64,
    ) -> AppResult<()> {
        self.records
            .lock()
            .unwrap()
            .push((user_id, provider.to_string(), tokens, estimated_cost));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fake vendors

struct ScriptedContentProvider {
    response: Option<String>,
    model: &'static str,
    calls: AtomicUsize,
}

impl ScriptedContentProvider {
    fn succeeding(response: String, model: &'static str) -> Arc<Self> {
        Arc::new(Self {
            response: Some(response),
            model,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(model: &'static str) -> Arc<Self> {
        Arc::new(Self {
            response: None,
            model,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for ScriptedContentProvider {
    async fn generate(
        &self,
        _system: &str,
        _user: &str,
        _max_tokens: u16,
        _temperature: f32,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(ProviderError::Api(format!("{} is down", self.model))),
        }
    }

    fn model(&self) -> &str {
        self.model
    }
}

struct FakeSpeechProvider {
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeSpeechProvider {
    fn instant() -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::from_secs(30),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SpeechProvider for FakeSpeechProvider {
    async fn synthesize(
        &self,
        _text: &str,
        _voice: &str,
        _speed: f32,
    ) -> Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(vec![0xAAu8; 128])
    }

    fn model(&self) -> &str {
        "tts-test"
    }

    fn max_text_len(&self) -> usize {
        4096
    }
}

struct MapGeocoder {
    answers: HashMap<String, (f64, f64)>,
}

#[async_trait]
impl GeocodingProvider for MapGeocoder {
    async fn search(
        &self,
        query: &str,
        _near: Option<(f64, f64)>,
        _radius_m: u32,
        _limit: u32,
    ) -> Result<Vec<GeoPoint>, GeocodingError> {
        Ok(self
            .answers
            .get(query)
            .map(|(lat, lng)| {
                vec![GeoPoint {
                    name: query.to_string(),
                    latitude: *lat,
                    longitude: *lng,
                }]
            })
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Harness

const NARRATION: &str = "Welcome to the old town, where every alley carries a story worth telling.\n\nThe market square has hosted traders since the twelfth century, and the guild hall still watches over it.\n\nOur walk ends by the river gate, where the old crane stands as it has for four hundred years.";

fn anchor_location() -> Location {
    Location {
        id: Uuid::new_v4(),
        name: "Dam Square".to_string(),
        city: Some("Amsterdam".to_string()),
        country: Some("Netherlands".to_string()),
        latitude: Some(52.3730),
        longitude: Some(4.8926),
    }
}

fn tour_response_json(with_stops: bool) -> String {
    let stops = serde_json::json!([
        {"name": "Market Square", "description": "The trading heart", "approximate_address": "Markt 1", "highlights": ["stalls"]},
        {"name": "Guild Hall", "description": "Seat of the guilds", "approximate_address": "Markt 2", "highlights": []},
        {"name": "River Gate", "description": "Medieval gate", "approximate_address": "Rivierstraat 3", "highlights": ["view"]},
        {"name": "Old Crane", "description": "Harbour crane", "approximate_address": "Kade 4", "highlights": []}
    ]);

    let mut body = serde_json::json!({
        "title": "Old Town Walk",
        "content": NARRATION,
    });
    if with_stops {
        body["walkable_stops"] = stops;
    }
    body.to_string()
}

fn stop_coordinates() -> HashMap<String, (f64, f64)> {
    [
        ("Market Square, Amsterdam", (52.3731, 4.8930)),
        ("Guild Hall, Amsterdam", (52.3735, 4.8935)),
        ("River Gate, Amsterdam", (52.3738, 4.8941)),
        ("Old Crane, Amsterdam", (52.3741, 4.8946)),
    ]
    .into_iter()
    .map(|(query, point)| (query.to_string(), point))
    .collect()
}

struct Harness {
    service: Arc<TourService>,
    store: Arc<FakeTourStore>,
    usage: Arc<FakeUsageStore>,
    cache: Arc<dyn Cache>,
    location: Location,
    user_id: Uuid,
}

fn build_harness(
    openai: Arc<ScriptedContentProvider>,
    anthropic: Arc<ScriptedContentProvider>,
    speech: Arc<FakeSpeechProvider>,
    synthesis_timeout: Duration,
) -> Harness {
    let store = Arc::new(FakeTourStore::default());
    let usage = Arc::new(FakeUsageStore::default());
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(1000));
    let location = anchor_location();

    let locations = Arc::new(FakeLocationStore {
        locations: HashMap::from([(location.id, location.clone())]),
    });

    let content = Arc::new(ContentService::new(
        openai,
        anthropic,
        cache.clone(),
        Duration::from_secs(600),
    ));
    let speech = Arc::new(SpeechService::new(
        speech,
        cache.clone(),
        Duration::from_secs(600),
    ));
    let route = Arc::new(RouteService::new(
        Arc::new(MapGeocoder {
            answers: stop_coordinates(),
        }),
        Duration::ZERO,
    ));

    let service = Arc::new(TourService::new(
        store.clone(),
        locations,
        usage.clone(),
        content,
        speech,
        route,
        cache.clone(),
        TourPipelineSettings {
            api_base_url: "http://localhost:8080".to_string(),
            default_provider: ProviderId::OpenAi,
            default_voice: "alloy".to_string(),
            tts_speed: 1.2,
            audio_ttl: Duration::from_secs(600),
            content_timeout: Duration::from_secs(5),
            synthesis_timeout,
            synthesis_timeout_chunked: synthesis_timeout,
        },
    ));

    Harness {
        service,
        store,
        usage,
        cache,
        location,
        user_id: Uuid::new_v4(),
    }
}

fn generation_request(location_id: Uuid) -> TourGenerationRequest {
    TourGenerationRequest {
        location_id,
        interests: vec!["history".to_string(), "architecture".to_string()],
        duration_minutes: 30,
        language: "en".to_string(),
        narration_style: "conversational".to_string(),
        voice: None,
    }
}

async fn wait_until_terminal(harness: &Harness, tour_id: Uuid) -> Tour {
    for _ in 0..200 {
        let tour = harness
            .service
            .get_tour(harness.user_id, tour_id)
            .await
            .expect("tour should exist");
        if tour.status.is_terminal() {
            return tour;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tour never reached a terminal status");
}

// ---------------------------------------------------------------------------
// Scenarios

#[tokio::test]
async fn test_full_pipeline_reaches_ready_with_stops_audio_and_transcript() {
    let openai = ScriptedContentProvider::succeeding(tour_response_json(true), "gpt-test");
    let anthropic = ScriptedContentProvider::failing("claude-test");
    let harness = build_harness(
        openai.clone(),
        anthropic.clone(),
        FakeSpeechProvider::instant(),
        Duration::from_secs(5),
    );

    let tour = harness
        .service
        .start_generation(harness.user_id, generation_request(harness.location.id))
        .await
        .unwrap();
    assert_eq!(tour.status, TourStatus::Generating);

    let tour = wait_until_terminal(&harness, tour.id).await;

    assert_eq!(tour.status, TourStatus::Ready);
    assert_eq!(tour.title, "Old Town Walk");
    assert_eq!(tour.content, NARRATION);
    assert_eq!(tour.llm_provider.as_deref(), Some("openai"));
    assert_eq!(anthropic.call_count(), 0);

    // All four stops resolved, in narrative order
    let stops = &tour.walkable_stops.0;
    assert_eq!(stops.len(), 4);
    for (index, stop) in stops.iter().enumerate() {
        assert_eq!(stop.order_index, index as i32);
        assert!(stop.latitude != 0.0 && stop.longitude != 0.0);
    }
    assert!(tour.total_walking_distance.unwrap() > 0.0);
    assert_eq!(tour.difficulty_level.as_deref(), Some("easy"));

    // Transcript covers the full estimated duration exactly
    let transcript = &tour.transcript.0;
    assert!(!transcript.is_empty());
    let expected_duration = estimate_audio_duration(NARRATION);
    let expected_end = (expected_duration * 100.0).round() / 100.0;
    assert_eq!(transcript.last().unwrap().end_time, expected_end);

    // Audio was cached and is served back
    assert!(tour.audio_url.is_some());
    let audio = harness
        .service
        .get_audio(harness.user_id, tour.id)
        .await
        .unwrap();
    assert_eq!(audio, vec![0xAAu8; 128]);

    // Usage accounted once, against the provider that answered
    let records = harness.usage.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].1, "openai");
    assert!(records[0].2 > 0);
}

#[tokio::test]
async fn test_synthesis_timeout_still_produces_ready_text_only_tour() {
    let openai = ScriptedContentProvider::succeeding(tour_response_json(false), "gpt-test");
    let anthropic = ScriptedContentProvider::failing("claude-test");
    let harness = build_harness(
        openai,
        anthropic,
        FakeSpeechProvider::hanging(),
        Duration::from_millis(50),
    );

    let tour = harness
        .service
        .start_generation(harness.user_id, generation_request(harness.location.id))
        .await
        .unwrap();
    let tour = wait_until_terminal(&harness, tour.id).await;

    assert_eq!(tour.status, TourStatus::Ready);
    assert!(tour.audio_url.is_none());
    assert!(!tour.content.is_empty());
    assert!(!tour.transcript.0.is_empty());

    let status = harness
        .service
        .get_status(harness.user_id, tour.id)
        .await
        .unwrap();
    assert_eq!(status.progress, 100);
    assert!(!status.has_audio);
}

#[tokio::test]
async fn test_provider_fallback_tags_metadata_and_calls_each_once() {
    let openai = ScriptedContentProvider::failing("gpt-test");
    let anthropic = ScriptedContentProvider::succeeding(tour_response_json(false), "claude-test");
    let harness = build_harness(
        openai.clone(),
        anthropic.clone(),
        FakeSpeechProvider::instant(),
        Duration::from_secs(5),
    );

    let tour = harness
        .service
        .start_generation(harness.user_id, generation_request(harness.location.id))
        .await
        .unwrap();
    let tour = wait_until_terminal(&harness, tour.id).await;

    assert_eq!(tour.status, TourStatus::Ready);
    assert_eq!(tour.llm_provider.as_deref(), Some("anthropic"));
    assert_eq!(openai.call_count(), 1);
    assert_eq!(anthropic.call_count(), 1);
    assert_eq!(tour.generation_params["fallback_used"], true);
    assert_eq!(tour.generation_params["original_provider"], "openai");
    assert_eq!(tour.generation_params["actual_provider"], "anthropic");
}

#[tokio::test]
async fn test_both_providers_failing_marks_tour_errored() {
    let openai = ScriptedContentProvider::failing("gpt-test");
    let anthropic = ScriptedContentProvider::failing("claude-test");
    let harness = build_harness(
        openai.clone(),
        anthropic.clone(),
        FakeSpeechProvider::instant(),
        Duration::from_secs(5),
    );

    let tour = harness
        .service
        .start_generation(harness.user_id, generation_request(harness.location.id))
        .await
        .unwrap();
    let tour = wait_until_terminal(&harness, tour.id).await;

    assert_eq!(tour.status, TourStatus::Error);
    assert_eq!(openai.call_count(), 1);
    assert_eq!(anthropic.call_count(), 1);

    let reason = tour.description.unwrap();
    assert!(reason.starts_with("LLM error:"));
    assert!(reason.contains("gpt-test is down"));
    assert!(reason.contains("claude-test is down"));
    assert!(reason.len() <= 255);

    let status = harness
        .service
        .get_status(harness.user_id, tour.id)
        .await
        .unwrap();
    assert_eq!(status.progress, 0);
}

#[tokio::test]
async fn test_unknown_location_rejected_before_creating_a_tour() {
    let harness = build_harness(
        ScriptedContentProvider::succeeding(tour_response_json(false), "gpt-test"),
        ScriptedContentProvider::failing("claude-test"),
        FakeSpeechProvider::instant(),
        Duration::from_secs(5),
    );

    let result = harness
        .service
        .start_generation(harness.user_id, generation_request(Uuid::new_v4()))
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(harness.store.tours.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_tours_are_owner_scoped() {
    let harness = build_harness(
        ScriptedContentProvider::succeeding(tour_response_json(false), "gpt-test"),
        ScriptedContentProvider::failing("claude-test"),
        FakeSpeechProvider::instant(),
        Duration::from_secs(5),
    );

    let tour = harness
        .service
        .start_generation(harness.user_id, generation_request(harness.location.id))
        .await
        .unwrap();
    wait_until_terminal(&harness, tour.id).await;

    let stranger = Uuid::new_v4();
    let result = harness.service.get_tour(stranger, tour.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let listed = harness.service.list_tours(stranger, 50, 0).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_delete_removes_tour_and_cached_audio() {
    let harness = build_harness(
        ScriptedContentProvider::succeeding(tour_response_json(false), "gpt-test"),
        ScriptedContentProvider::failing("claude-test"),
        FakeSpeechProvider::instant(),
        Duration::from_secs(5),
    );

    let tour = harness
        .service
        .start_generation(harness.user_id, generation_request(harness.location.id))
        .await
        .unwrap();
    let tour = wait_until_terminal(&harness, tour.id).await;
    assert_eq!(tour.status, TourStatus::Ready);

    harness
        .service
        .delete_tour(harness.user_id, tour.id)
        .await
        .unwrap();

    let result = harness.service.get_tour(harness.user_id, tour.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let audio_key = format!("audio:tour:{}", tour.id);
    assert!(harness.cache.get(&audio_key).await.is_none());
}

#[tokio::test]
async fn test_audio_cache_miss_heals_through_resynthesis() {
    let speech = FakeSpeechProvider::instant();
    let harness = build_harness(
        ScriptedContentProvider::succeeding(tour_response_json(false), "gpt-test"),
        ScriptedContentProvider::failing("claude-test"),
        speech.clone(),
        Duration::from_secs(5),
    );

    let tour = harness
        .service
        .start_generation(harness.user_id, generation_request(harness.location.id))
        .await
        .unwrap();
    let tour = wait_until_terminal(&harness, tour.id).await;

    // Simulate cache expiry
    let audio_key = format!("audio:tour:{}", tour.id);
    harness.cache.delete(&audio_key).await;

    let audio = harness
        .service
        .get_audio(harness.user_id, tour.id)
        .await
        .unwrap();
    assert_eq!(audio, vec![0xAAu8; 128]);
    assert!(harness.cache.get(&audio_key).await.is_some());
}
