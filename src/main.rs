use async_openai::{config::OpenAIConfig, Client};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strollcast_backend::domain::content::{ContentService, ProviderId};
use strollcast_backend::domain::route::RouteService;
use strollcast_backend::domain::speech::SpeechService;
use strollcast_backend::domain::tour::service::TourPipelineSettings;
use strollcast_backend::domain::tour::TourService;
use strollcast_backend::infrastructure::cache::{Cache, MemoryCache};
use strollcast_backend::infrastructure::config::{Config, LogFormat};
use strollcast_backend::infrastructure::db::{check_connection, create_pool};
use strollcast_backend::infrastructure::http::start_http_server;
use strollcast_backend::infrastructure::providers::{
    AnthropicContentProvider, NominatimClient, OpenAiContentProvider, OpenAiSpeechProvider,
};
use strollcast_backend::infrastructure::repositories::{
    LocationRepository, TourRepository, UsageRepository, UserRepository,
};

/// Nominatim's usage policy allows at most one request per second
const GEOCODING_DELAY: Duration = Duration::from_secs(1);

const CACHE_MAX_ENTRIES: u64 = 10_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting Strollcast Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Shared vendor clients and cache
    let openai_client = Arc::new(Client::with_config(
        OpenAIConfig::new().with_api_key(config.openai_api_key.clone()),
    ));
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(CACHE_MAX_ENTRIES));

    // 2. Instantiate repositories (inject db pool)
    tracing::info!("Instantiating repositories...");
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let tour_repo = Arc::new(TourRepository::new(pool.clone()));
    let location_repo = Arc::new(LocationRepository::new(pool.clone()));
    let usage_repo = Arc::new(UsageRepository::new(pool.clone()));

    // 3. Instantiate services (inject providers, cache, repositories)
    tracing::info!("Instantiating services...");
    let content_service = Arc::new(ContentService::new(
        Arc::new(OpenAiContentProvider::new(
            openai_client.clone(),
            config.openai_model.clone(),
        )),
        Arc::new(AnthropicContentProvider::new(
            config.anthropic_api_key.clone(),
            config.anthropic_model.clone(),
        )),
        cache.clone(),
        Duration::from_secs(config.cache_ttl_content),
    ));
    let speech_service = Arc::new(SpeechService::new(
        Arc::new(OpenAiSpeechProvider::new(
            openai_client.clone(),
            config.tts_model.clone(),
        )),
        cache.clone(),
        Duration::from_secs(config.cache_ttl_audio),
    ));
    let route_service = Arc::new(RouteService::new(
        Arc::new(NominatimClient::new(
            config.nominatim_base_url.clone(),
            config.nominatim_user_agent.clone(),
        )),
        GEOCODING_DELAY,
    ));
    let tour_service = Arc::new(TourService::new(
        tour_repo,
        location_repo,
        usage_repo,
        content_service,
        speech_service,
        route_service,
        cache.clone(),
        TourPipelineSettings {
            api_base_url: config.api_base_url.clone(),
            default_provider: ProviderId::from_str_or_default(&config.default_content_provider),
            default_voice: config.tts_voice.clone(),
            tts_speed: config.tts_speed,
            audio_ttl: Duration::from_secs(config.cache_ttl_audio),
            content_timeout: Duration::from_secs(config.content_timeout_secs),
            synthesis_timeout: Duration::from_secs(config.synthesis_timeout_secs),
            synthesis_timeout_chunked: Duration::from_secs(config.synthesis_timeout_chunked_secs),
        },
    ));

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let tour_controller = Arc::new(strollcast_backend::controllers::tour::TourController::new(
        tour_service,
    ));

    // Start HTTP server with all routes
    start_http_server(pool, config, user_repo, tour_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "strollcast_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "strollcast_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
