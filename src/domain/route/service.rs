use super::distance::haversine_distance;
use crate::domain::tour::model::{GeocodedStop, Location, StopCandidate};
use crate::infrastructure::providers::GeocodingProvider;
use std::sync::Arc;
use std::time::Duration;

/// Stops must resolve within walking range of the anchor
const SEARCH_RADIUS_M: u32 = 2000;

/// Venue names that often live inside a larger park or square and need
/// broader query phrasing to resolve
const PARK_VENUES: [&str; 7] = [
    "pavilion", "theatre", "theater", "garden", "monument", "statue", "fountain",
];

/// Resolves generated stop candidates to coordinates. Resolution is best
/// effort: candidates that fail every query variant are dropped, never
/// reported as errors.
pub struct RouteService {
    geocoder: Arc<dyn GeocodingProvider>,
    inter_request_delay: Duration,
}

impl RouteService {
    pub fn new(geocoder: Arc<dyn GeocodingProvider>, inter_request_delay: Duration) -> Self {
        Self {
            geocoder,
            inter_request_delay,
        }
    }

    /// Resolve candidates in narrative order. Each resolved stop carries the
    /// distance from the previously resolved stop, with the tour anchor as
    /// the reference for the first one.
    pub async fn resolve_stops(
        &self,
        candidates: &[StopCandidate],
        anchor: &Location,
    ) -> Vec<GeocodedStop> {
        let mut resolved = Vec::new();
        let mut previous = anchor.coordinates();

        for (index, candidate) in candidates.iter().enumerate() {
            if candidate.name.trim().is_empty() {
                tracing::warn!(stop_index = index, "Skipping stop candidate without a name");
                continue;
            }

            // Nominatim rate limiting: one request burst per stop, spaced out
            if index > 0 && !self.inter_request_delay.is_zero() {
                tokio::time::sleep(self.inter_request_delay).await;
            }

            match self.geocode_stop(candidate, anchor).await {
                Some((latitude, longitude)) => {
                    let distance_from_previous = previous
                        .map(|(lat, lng)| haversine_distance(lat, lng, latitude, longitude))
                        .unwrap_or(0.0);
                    previous = Some((latitude, longitude));

                    tracing::info!(
                        stop_name = %candidate.name,
                        latitude,
                        longitude,
                        distance_from_previous,
                        "Geocoded walkable stop"
                    );

                    resolved.push(GeocodedStop {
                        name: candidate.name.clone(),
                        description: candidate.description.clone(),
                        approximate_address: candidate.approximate_address.clone(),
                        highlights: candidate.highlights.clone(),
                        order_index: resolved.len() as i32,
                        latitude,
                        longitude,
                        geocoding_accuracy: "geocoded".to_string(),
                        distance_from_previous,
                    });
                }
                None => {
                    tracing::warn!(
                        stop_name = %candidate.name,
                        "Could not geocode stop, dropping it from the route"
                    );
                }
            }
        }

        tracing::info!(
            resolved_count = resolved.len(),
            candidate_count = candidates.len(),
            "Stop resolution finished"
        );

        resolved
    }

    async fn geocode_stop(
        &self,
        candidate: &StopCandidate,
        anchor: &Location,
    ) -> Option<(f64, f64)> {
        let queries = build_query_variants(&candidate.name, anchor);

        for query in &queries {
            tracing::debug!(stop_name = %candidate.name, query = %query, "Trying geocoding query");

            match self
                .geocoder
                .search(query, anchor.coordinates(), SEARCH_RADIUS_M, 1)
                .await
            {
                Ok(points) => {
                    if let Some(point) = points.first() {
                        return Some((point.latitude, point.longitude));
                    }
                }
                Err(err) => {
                    tracing::error!(
                        stop_name = %candidate.name,
                        query = %query,
                        error = %err,
                        "Geocoding request failed"
                    );
                    return None;
                }
            }
        }

        None
    }
}

/// Strip narrative phrasing like "Back to the Eiffel Tower" down to the
/// place name itself
fn normalize_stop_name(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.contains("back to") || lower.contains("return to") {
        let cleaned = lower
            .replace("back to the ", "")
            .replace("back to ", "")
            .replace("return to the ", "")
            .replace("return to ", "");
        title_case(&cleaned)
    } else {
        name.to_string()
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query variants in decreasing specificity, plus broader phrasings for
/// venues that tend to sit inside parks
fn build_query_variants(name: &str, anchor: &Location) -> Vec<String> {
    let cleaned = normalize_stop_name(name);
    let city = anchor.city.as_deref().unwrap_or("");
    let country = anchor.country.as_deref().unwrap_or("");

    let mut queries = Vec::new();
    if !city.is_empty() {
        queries.push(format!("{}, {}", cleaned, city));
    }
    if !city.is_empty() && !country.is_empty() {
        queries.push(format!("{}, {}, {}", cleaned, city, country));
    }
    queries.push(cleaned.clone());

    let cleaned_lower = cleaned.to_lowercase();
    if !city.is_empty() && PARK_VENUES.iter().any(|venue| cleaned_lower.contains(venue)) {
        queries.push(format!("{} near {}", cleaned, city));
        queries.push(format!("{} {} park", cleaned, city));
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::{GeoPoint, GeocodingError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct MapGeocoder {
        answers: HashMap<String, (f64, f64)>,
        queries: Mutex<Vec<String>>,
    }

    impl MapGeocoder {
        fn new(answers: &[(&str, (f64, f64))]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(q, p)| (q.to_string(), *p))
                    .collect(),
                queries: Mutex::new(Vec::new()),
            }
        }
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
            self.queries.lock().unwrap().push(query.to_string());
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

    fn anchor() -> Location {
        Location {
            id: Uuid::new_v4(),
            name: "Dam Square".to_string(),
            city: Some("Amsterdam".to_string()),
            country: Some("Netherlands".to_string()),
            latitude: Some(52.3730),
            longitude: Some(4.8926),
        }
    }

    fn candidate(name: &str) -> StopCandidate {
        StopCandidate {
            name: name.to_string(),
            description: "A stop".to_string(),
            approximate_address: String::new(),
            highlights: vec![],
        }
    }

    fn service(geocoder: Arc<MapGeocoder>) -> RouteService {
        RouteService::new(geocoder, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_resolves_with_city_qualified_query() {
        let geocoder = Arc::new(MapGeocoder::new(&[(
            "Royal Palace, Amsterdam",
            (52.3731, 4.8913),
        )]));
        let service = service(geocoder.clone());

        let stops = service
            .resolve_stops(&[candidate("Royal Palace")], &anchor())
            .await;

        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].latitude, 52.3731);
        assert_eq!(stops[0].geocoding_accuracy, "geocoded");
        assert_eq!(
            geocoder.queries.lock().unwrap().as_slice(),
            ["Royal Palace, Amsterdam"]
        );
    }

    #[tokio::test]
    async fn test_falls_back_through_query_variants() {
        let geocoder = Arc::new(MapGeocoder::new(&[("Westerkerk", (52.3744, 4.8839))]));
        let service = service(geocoder.clone());

        let stops = service
            .resolve_stops(&[candidate("Westerkerk")], &anchor())
            .await;

        assert_eq!(stops.len(), 1);
        let queries = geocoder.queries.lock().unwrap();
        assert_eq!(
            queries.as_slice(),
            [
                "Westerkerk, Amsterdam",
                "Westerkerk, Amsterdam, Netherlands",
                "Westerkerk",
            ]
        );
    }

    #[tokio::test]
    async fn test_normalizes_return_phrasing() {
        let geocoder = Arc::new(MapGeocoder::new(&[(
            "Dam Square, Amsterdam",
            (52.3730, 4.8926),
        )]));
        let service = service(geocoder.clone());

        let stops = service
            .resolve_stops(&[candidate("Back to the Dam Square")], &anchor())
            .await;

        assert_eq!(stops.len(), 1);
        // The persisted stop keeps the narrative name
        assert_eq!(stops[0].name, "Back to the Dam Square");
        assert_eq!(
            geocoder.queries.lock().unwrap()[0],
            "Dam Square, Amsterdam"
        );
    }

    #[tokio::test]
    async fn test_venue_names_get_broader_queries() {
        let geocoder = Arc::new(MapGeocoder::new(&[(
            "Rose Garden Amsterdam park",
            (52.3580, 4.8686),
        )]));
        let service = service(geocoder.clone());

        let stops = service
            .resolve_stops(&[candidate("Rose Garden")], &anchor())
            .await;

        assert_eq!(stops.len(), 1);
        let queries = geocoder.queries.lock().unwrap();
        assert!(queries.contains(&"Rose Garden near Amsterdam".to_string()));
        assert!(queries.contains(&"Rose Garden Amsterdam park".to_string()));
    }

    #[tokio::test]
    async fn test_unresolved_candidate_is_dropped_and_chain_continues() {
        let geocoder = Arc::new(MapGeocoder::new(&[
            ("Royal Palace, Amsterdam", (52.3731, 4.8913)),
            ("Westerkerk, Amsterdam", (52.3744, 4.8839)),
        ]));
        let service = service(geocoder);

        let stops = service
            .resolve_stops(
                &[
                    candidate("Royal Palace"),
                    candidate("Nowhere At All"),
                    candidate("Westerkerk"),
                ],
                &anchor(),
            )
            .await;

        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].order_index, 0);
        assert_eq!(stops[1].order_index, 1);
        // Second resolved stop measures from the first resolved one, not
        // from the dropped candidate
        assert!(stops[1].distance_from_previous > 0.0);
        assert!(stops[1].distance_from_previous < 1000.0);
    }

    #[tokio::test]
    async fn test_first_stop_measures_from_anchor() {
        let geocoder = Arc::new(MapGeocoder::new(&[(
            "Royal Palace, Amsterdam",
            (52.3731, 4.8913),
        )]));
        let service = service(geocoder);

        let stops = service
            .resolve_stops(&[candidate("Royal Palace")], &anchor())
            .await;

        // Roughly 90 meters between Dam Square and the Royal Palace
        assert!(stops[0].distance_from_previous > 10.0);
        assert!(stops[0].distance_from_previous < 500.0);
    }

    #[tokio::test]
    async fn test_anchor_without_coordinates_yields_zero_first_distance() {
        let geocoder = Arc::new(MapGeocoder::new(&[(
            "Royal Palace, Amsterdam",
            (52.3731, 4.8913),
        )]));
        let service = service(geocoder);

        let mut anchor = anchor();
        anchor.latitude = None;
        anchor.longitude = None;

        let stops = service
            .resolve_stops(&[candidate("Royal Palace")], &anchor)
            .await;

        assert_eq!(stops[0].distance_from_previous, 0.0);
    }
}
