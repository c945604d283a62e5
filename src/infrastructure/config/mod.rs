use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub api_base_url: String,
    pub jwt_secret: String,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Content providers
    pub default_content_provider: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    // Text-to-speech
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,
    // Geocoding
    pub nominatim_base_url: String,
    pub nominatim_user_agent: String,
    // Cache TTLs (seconds)
    pub cache_ttl_content: u64,
    pub cache_ttl_audio: u64,
    // Background stage timeouts (seconds)
    pub content_timeout_secs: u64,
    pub synthesis_timeout_secs: u64,
    pub synthesis_timeout_chunked_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            jwt_secret: env::var("JWT_SECRET")?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            default_content_provider: env::var("DEFAULT_CONTENT_PROVIDER")
                .unwrap_or_else(|_| "openai".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY")?,
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-3-haiku-20240307".to_string()),
            tts_model: env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string()),
            tts_voice: env::var("TTS_VOICE").unwrap_or_else(|_| "alloy".to_string()),
            tts_speed: env::var("TTS_SPEED")
                .unwrap_or_else(|_| "1.2".to_string())
                .parse()?,
            nominatim_base_url: env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            nominatim_user_agent: env::var("NOMINATIM_USER_AGENT")
                .unwrap_or_else(|_| "Strollcast/1.0 (contact@strollcast.app)".to_string()),
            cache_ttl_content: env::var("CACHE_TTL_CONTENT")
                .unwrap_or_else(|_| (86400 * 7).to_string())
                .parse()?,
            cache_ttl_audio: env::var("CACHE_TTL_AUDIO")
                .unwrap_or_else(|_| (86400 * 30).to_string())
                .parse()?,
            content_timeout_secs: env::var("CONTENT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            synthesis_timeout_secs: env::var("SYNTHESIS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "180".to_string())
                .parse()?,
            synthesis_timeout_chunked_secs: env::var("SYNTHESIS_TIMEOUT_CHUNKED_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
