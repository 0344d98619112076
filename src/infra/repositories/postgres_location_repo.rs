use crate::domain::{models::location::Location, ports::LocationRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Row, PgPool};

pub struct PostgresLocationRepo {
    pool: PgPool,
}

impl PostgresLocationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for PostgresLocationRepo {
    async fn create(&self, location: &Location) -> Result<Location, AppError> {
        sqlx::query_as::<_, Location>(
            r#"INSERT INTO locations (
                id, name, address, capacity, timezone, is_active, allowed_camp_types, allowed_dates, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *"#
        )
            .bind(&location.id)
            .bind(&location.name)
            .bind(&location.address)
            .bind(location.capacity)
            .bind(&location.timezone)
            .bind(location.is_active)
            .bind(&location.allowed_camp_types)
            .bind(&location.allowed_dates)
            .bind(location.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Location>, AppError> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Location>, AppError> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, location: &Location) -> Result<Location, AppError> {
        sqlx::query_as::<_, Location>(
            r#"UPDATE locations SET
                name=$1, address=$2, capacity=$3, timezone=$4, is_active=$5, allowed_camp_types=$6, allowed_dates=$7
               WHERE id=$8 RETURNING *"#
        )
            .bind(&location.name)
            .bind(&location.address)
            .bind(location.capacity)
            .bind(&location.timezone)
            .bind(location.is_active)
            .bind(&location.allowed_camp_types)
            .bind(&location.allowed_dates)
            .bind(&location.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(format!("Location {} not found", location.id)))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let refs = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM bookings WHERE location_id = $1) + (SELECT COUNT(*) FROM recurring_templates WHERE location_id = $2) + (SELECT COUNT(*) FROM events WHERE location_id = $3) AS refs"
        )
            .bind(id).bind(id).bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        if refs.get::<i64, _>("refs") > 0 {
            return Err(AppError::Conflict("Location is still referenced; deactivate it instead".into()));
        }

        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Location not found".into()));
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
