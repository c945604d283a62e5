use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::tour::{
        CostEstimateResponse, Tour, TourGenerationRequest, TourService, TourStatusResponse,
    },
    error::{AppError, AppResult},
    infrastructure::auth::AuthUser,
};

const MIN_DURATION_MINUTES: i32 = 10;
const MAX_DURATION_MINUTES: i32 = 180;
const MAX_INTERESTS: usize = 5;

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub struct TourController {
    tour_service: Arc<TourService>,
}

impl TourController {
    pub fn new(tour_service: Arc<TourService>) -> Self {
        Self { tour_service }
    }

    fn validate(request: &TourGenerationRequest) -> AppResult<()> {
        if request.duration_minutes < MIN_DURATION_MINUTES
            || request.duration_minutes > MAX_DURATION_MINUTES
        {
            return Err(AppError::BadRequest(format!(
                "duration_minutes must be between {} and {}",
                MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
            )));
        }
        if request.interests.len() > MAX_INTERESTS {
            return Err(AppError::BadRequest(format!(
                "At most {} interests are supported",
                MAX_INTERESTS
            )));
        }
        Ok(())
    }

    /// POST /api/tours - Start generating a tour
    pub async fn create_tour(
        State(controller): State<Arc<TourController>>,
        Extension(auth_user): Extension<AuthUser>,
        Json(request): Json<TourGenerationRequest>,
    ) -> AppResult<(StatusCode, Json<Tour>)> {
        Self::validate(&request)?;

        let tour = controller
            .tour_service
            .start_generation(auth_user.user_id, request)
            .await?;

        Ok((StatusCode::CREATED, Json(tour)))
    }

    /// GET /api/tours - List the caller's tours
    pub async fn list_tours(
        State(controller): State<Arc<TourController>>,
        Extension(auth_user): Extension<AuthUser>,
        Query(pagination): Query<Pagination>,
    ) -> AppResult<Json<Vec<Tour>>> {
        let tours = controller
            .tour_service
            .list_tours(
                auth_user.user_id,
                pagination.limit.clamp(1, 100),
                pagination.offset.max(0),
            )
            .await?;

        Ok(Json(tours))
    }

    /// GET /api/tours/:tourId - Tour detail
    pub async fn get_tour(
        State(controller): State<Arc<TourController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(tour_id): Path<Uuid>,
    ) -> AppResult<Json<Tour>> {
        let tour = controller
            .tour_service
            .get_tour(auth_user.user_id, tour_id)
            .await?;

        Ok(Json(tour))
    }

    /// GET /api/tours/:tourId/status - Generation progress for polling
    pub async fn get_status(
        State(controller): State<Arc<TourController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(tour_id): Path<Uuid>,
    ) -> AppResult<Json<TourStatusResponse>> {
        let status = controller
            .tour_service
            .get_status(auth_user.user_id, tour_id)
            .await?;

        Ok(Json(status))
    }

    /// GET /api/tours/:tourId/audio - Synthesized narration
    pub async fn get_audio(
        State(controller): State<Arc<TourController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(tour_id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let audio = controller
            .tour_service
            .get_audio(auth_user.user_id, tour_id)
            .await?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));

        Ok((StatusCode::OK, headers, Body::from(audio)))
    }

    /// POST /api/tours/:tourId/audio/regenerate - Re-synthesize audio
    pub async fn regenerate_audio(
        State(controller): State<Arc<TourController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(tour_id): Path<Uuid>,
    ) -> AppResult<StatusCode> {
        controller
            .tour_service
            .regenerate_audio(auth_user.user_id, tour_id)
            .await?;

        Ok(StatusCode::ACCEPTED)
    }

    /// DELETE /api/tours/:tourId
    pub async fn delete_tour(
        State(controller): State<Arc<TourController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(tour_id): Path<Uuid>,
    ) -> AppResult<StatusCode> {
        controller
            .tour_service
            .delete_tour(auth_user.user_id, tour_id)
            .await?;

        Ok(StatusCode::NO_CONTENT)
    }

    /// POST /api/tours/estimate - Up-front cost estimate
    pub async fn estimate_cost(
        State(controller): State<Arc<TourController>>,
        Extension(_auth_user): Extension<AuthUser>,
        Json(request): Json<TourGenerationRequest>,
    ) -> AppResult<Json<CostEstimateResponse>> {
        Self::validate(&request)?;

        let estimate = controller.tour_service.estimate_cost(&request).await?;

        Ok(Json(estimate))
    }
}
