use crate::domain::route::{GeoPoint, GeocodingError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Rough conversion from meters to degrees of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Port for forward geocoding. Implementations return results ordered by
/// relevance; an empty vec is a valid "no match" answer.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        near: Option<(f64, f64)>,
        radius_m: u32,
        limit: u32,
    ) -> Result<Vec<GeoPoint>, GeocodingError>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Nominatim (OpenStreetMap) geocoding client. Nominatim's usage policy
/// requires an identifying User-Agent; callers are responsible for request
/// spacing.
pub struct NominatimClient {
    base_url: String,
    user_agent: String,
    http_client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(base_url: String, user_agent: String) -> Self {
        Self {
            base_url,
            user_agent,
            http_client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    fn search_url(&self, query: &str, near: Option<(f64, f64)>, radius_m: u32, limit: u32) -> String {
        let mut url = format!(
            "{}/search?q={}&format=json&addressdetails=1&limit={}&dedupe=1",
            self.base_url,
            urlencoding::encode(query),
            limit.min(50)
        );

        // Bias towards the anchor with a bounded viewbox
        if let Some((lat, lng)) = near {
            let delta = radius_m as f64 / METERS_PER_DEGREE;
            url.push_str(&format!(
                "&viewbox={},{},{},{}&bounded=1",
                lng - delta,
                lat + delta,
                lng + delta,
                lat - delta
            ));
        }

        url
    }
}

#[async_trait]
impl GeocodingProvider for NominatimClient {
    async fn search(
        &self,
        query: &str,
        near: Option<(f64, f64)>,
        radius_m: u32,
        limit: u32,
    ) -> Result<Vec<GeoPoint>, GeocodingError> {
        let url = self.search_url(query, near, radius_m, limit);

        let response = self
            .http_client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| GeocodingError::Request(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GeocodingError::Request(format!(
                "Nominatim returned {}",
                response.status()
            )));
        }

        let places: Vec<NominatimPlace> = response.json().await.map_err(|e| {
            GeocodingError::InvalidResponse(format!("Failed to parse Nominatim response: {}", e))
        })?;

        let points = places
            .into_iter()
            .filter_map(|place| {
                let latitude: f64 = place.lat.parse().ok()?;
                let longitude: f64 = place.lon.parse().ok()?;
                let name = place
                    .display_name
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                Some(GeoPoint {
                    name,
                    latitude,
                    longitude,
                })
            })
            .collect();

        Ok(points)
    }
}
