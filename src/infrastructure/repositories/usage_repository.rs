use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use crate::infrastructure::repositories::UsageStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Daily per-user accounting of generation volume and estimated spend
pub struct UsageRepository {
    pool: Arc<DbPool>,
}

impl UsageRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for UsageRepository {
    async fn record(
        &self,
        user_id: Uuid,
        provider: &str,
        tokens: i64,
        estimated_cost: f64,
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let now = Utc::now();
        let today = now.date_naive();
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO usage_tracking (id, user_id, date, tours_generated, tokens_used, estimated_cost, created_at, updated_at)
            VALUES ($1, $2, $3, 1, $4, $5, $6, $6)
            ON CONFLICT (user_id, date)
            DO UPDATE SET
                tours_generated = usage_tracking.tours_generated + 1,
                tokens_used = usage_tracking.tokens_used + $4,
                estimated_cost = usage_tracking.estimated_cost + $5,
                updated_at = $6
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(today)
        .bind(tokens)
        .bind(estimated_cost)
        .bind(now)
        .execute(pool)
        .await?;

        tracing::debug!(
            user_id = %user_id,
            provider = provider,
            tokens = tokens,
            estimated_cost = estimated_cost,
            "Usage recorded"
        );

        Ok(())
    }
}
