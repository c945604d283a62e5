use crate::domain::tour::model::{GeocodedStop, Tour, TranscriptSegment};
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use crate::infrastructure::repositories::TourStore;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;

const TOUR_COLUMNS: &str = r#"
    id, user_id, location_id, title, description, content, audio_url,
    transcript, duration_minutes, interests, language, narration_style,
    voice, llm_provider, llm_model, generation_params, walkable_stops,
    total_walking_distance, estimated_walking_time, difficulty_level,
    status, created_at, updated_at
"#;

pub struct TourRepository {
    pool: Arc<DbPool>,
}

impl TourRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TourStore for TourRepository {
    async fn insert(&self, tour: &Tour) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            INSERT INTO tours (
                id, user_id, location_id, title, description, content, audio_url,
                transcript, duration_minutes, interests, language, narration_style,
                voice, llm_provider, llm_model, generation_params, walkable_stops,
                total_walking_distance, estimated_walking_time, difficulty_level,
                status, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            "#,
        )
        .bind(tour.id)
        .bind(tour.user_id)
        .bind(tour.location_id)
        .bind(&tour.title)
        .bind(&tour.description)
        .bind(&tour.content)
        .bind(&tour.audio_url)
        .bind(&tour.transcript)
        .bind(tour.duration_minutes)
        .bind(&tour.interests)
        .bind(&tour.language)
        .bind(&tour.narration_style)
        .bind(&tour.voice)
        .bind(&tour.llm_provider)
        .bind(&tour.llm_model)
        .bind(&tour.generation_params)
        .bind(&tour.walkable_stops)
        .bind(tour.total_walking_distance)
        .bind(tour.estimated_walking_time)
        .bind(&tour.difficulty_level)
        .bind(tour.status)
        .bind(tour.created_at)
        .bind(tour.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn find_for_owner(&self, tour_id: Uuid, user_id: Uuid) -> AppResult<Option<Tour>> {
        let pool = self.pool.as_ref();
        let tour = sqlx::query_as::<_, Tour>(&format!(
            r#"
            SELECT {TOUR_COLUMNS}
            FROM tours
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(tour_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(tour)
    }

    async fn list_for_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Tour>> {
        let pool = self.pool.as_ref();
        let tours = sqlx::query_as::<_, Tour>(&format!(
            r#"
            SELECT {TOUR_COLUMNS}
            FROM tours
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tours)
    }

    async fn save_content(
        &self,
        tour_id: Uuid,
        title: &str,
        content: &str,
        llm_provider: &str,
        llm_model: &str,
        generation_params: &JsonValue,
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();

        // Status guard keeps a stale task from reviving a finished tour
        sqlx::query(
            r#"
            UPDATE tours
            SET title = $1,
                content = $2,
                llm_provider = $3,
                llm_model = $4,
                generation_params = $5,
                status = 'content_ready',
                updated_at = $6
            WHERE id = $7 AND status = 'generating'
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(llm_provider)
        .bind(llm_model)
        .bind(generation_params)
        .bind(Utc::now())
        .bind(tour_id)
        .execute(pool)
        .await?;

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
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            UPDATE tours
            SET walkable_stops = $1,
                total_walking_distance = $2,
                estimated_walking_time = $3,
                difficulty_level = $4,
                updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(Json(stops))
        .bind(total_distance)
        .bind(walking_time_minutes)
        .bind(difficulty)
        .bind(Utc::now())
        .bind(tour_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn finalize(
        &self,
        tour_id: Uuid,
        audio_url: Option<&str>,
        transcript: &[TranscriptSegment],
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            UPDATE tours
            SET audio_url = $1,
                transcript = $2,
                status = 'ready',
                updated_at = $3
            WHERE id = $4 AND status IN ('generating', 'content_ready')
            "#,
        )
        .bind(audio_url)
        .bind(Json(transcript))
        .bind(Utc::now())
        .bind(tour_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn set_error(&self, tour_id: Uuid, reason: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            UPDATE tours
            SET status = 'error',
                description = $1,
                updated_at = $2
            WHERE id = $3 AND status NOT IN ('ready', 'error')
            "#,
        )
        .bind(reason)
        .bind(Utc::now())
        .bind(tour_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn set_audio_url_if_absent(&self, tour_id: Uuid, audio_url: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            UPDATE tours
            SET audio_url = $1,
                updated_at = $2
            WHERE id = $3 AND audio_url IS NULL
            "#,
        )
        .bind(audio_url)
        .bind(Utc::now())
        .bind(tour_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, tour_id: Uuid) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            DELETE FROM tours
            WHERE id = $1
            "#,
        )
        .bind(tour_id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
