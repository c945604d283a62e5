use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::infrastructure::repositories::UserRepository;
use crate::{
    controllers::{health, tour::TourController},
    infrastructure::auth::{auth_middleware, request_id_middleware},
};

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    user_repo: Arc<UserRepository>,
    tour_controller: Arc<TourController>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Tour routes (require authentication)
    let tour_routes = Router::new()
        .route(
            "/api/tours",
            get(TourController::list_tours).post(TourController::create_tour),
        )
        .route("/api/tours/estimate", post(TourController::estimate_cost))
        .route(
            "/api/tours/:tourId",
            get(TourController::get_tour).delete(TourController::delete_tour),
        )
        .route("/api/tours/:tourId/status", get(TourController::get_status))
        .route("/api/tours/:tourId/audio", get(TourController::get_audio))
        .route(
            "/api/tours/:tourId/audio/regenerate",
            post(TourController::regenerate_audio),
        )
        .with_state(tour_controller.clone())
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            auth_middleware,
        ));

    // Build application routes
    let app = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool.clone())
        .merge(tour_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
