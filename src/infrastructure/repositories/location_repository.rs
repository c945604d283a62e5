use crate::domain::tour::model::Location;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use crate::infrastructure::repositories::LocationStore;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub struct LocationRepository {
    pool: Arc<DbPool>,
}

impl LocationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for LocationRepository {
    async fn find_by_id(&self, location_id: Uuid) -> AppResult<Option<Location>> {
        let pool = self.pool.as_ref();
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, name, city, country, latitude, longitude
            FROM locations
            WHERE id = $1
            "#,
        )
        .bind(location_id)
        .fetch_optional(pool)
        .await?;

        Ok(location)
    }
}
