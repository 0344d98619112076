use crate::domain::{models::event::Event, ports::EventRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

pub struct SqliteEventRepo {
    pool: SqlitePool,
}

impl SqliteEventRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const INSERT_EVENT: &str = r#"INSERT INTO events (
        id, template_id, product_id, location_id, title, event_type,
        start_time, end_time, local_day, status, created_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#;

#[async_trait]
impl EventRepository for SqliteEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(&format!("{} RETURNING *", INSERT_EVENT))
            .bind(&event.id)
            .bind(&event.template_id)
            .bind(&event.product_id)
            .bind(&event.location_id)
            .bind(&event.title)
            .bind(&event.event_type)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.local_day)
            .bind(event.status.as_str())
            .bind(event.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn insert_if_absent(&self, event: &Event) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, Event>(&format!(
            "{} ON CONFLICT(template_id, location_id, local_day) DO NOTHING RETURNING *",
            INSERT_EVENT
        ))
            .bind(&event.id)
            .bind(&event.template_id)
            .bind(&event.product_id)
            .bind(&event.location_id)
            .bind(&event.title)
            .bind(&event.event_type)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.local_day)
            .bind(event.status.as_str())
            .bind(event.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_template(&self, template_id: &str) -> Result<Vec<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE template_id = ? ORDER BY local_day ASC")
            .bind(template_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_day(&self, product_id: &str, location_id: &str, day: NaiveDate) -> Result<Vec<Event>, AppError> {
        sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE product_id = ? AND location_id = ? AND local_day = ? AND status != 'CANCELLED' ORDER BY id ASC"
        )
            .bind(product_id)
            .bind(location_id)
            .bind(day)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_range(&self, location_id: Option<&str>, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Event>, AppError> {
        sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE start_time >= ? AND start_time < ? AND (? IS NULL OR location_id = ?) ORDER BY start_time ASC, id ASC"
        )
            .bind(start)
            .bind(end)
            .bind(location_id)
            .bind(location_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
