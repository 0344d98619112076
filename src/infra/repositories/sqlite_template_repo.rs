use crate::domain::{models::template::RecurringTemplate, ports::TemplateRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

pub struct SqliteTemplateRepo {
    pool: SqlitePool,
}

impl SqliteTemplateRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for SqliteTemplateRepo {
    async fn create(&self, template: &RecurringTemplate) -> Result<RecurringTemplate, AppError> {
        sqlx::query_as::<_, RecurringTemplate>(
            r#"INSERT INTO recurring_templates (
                id, name, title, camp_type, product_id, location_id,
                start_date, end_date, start_time, end_time, weekday_mask, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&template.id)
            .bind(&template.name)
            .bind(&template.title)
            .bind(&template.camp_type)
            .bind(&template.product_id)
            .bind(&template.location_id)
            .bind(template.start_date)
            .bind(template.end_date)
            .bind(template.start_time)
            .bind(template.end_time)
            .bind(template.weekday_mask)
            .bind(template.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RecurringTemplate>, AppError> {
        sqlx::query_as::<_, RecurringTemplate>("SELECT * FROM recurring_templates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<RecurringTemplate>, AppError> {
        sqlx::query_as::<_, RecurringTemplate>("SELECT * FROM recurring_templates ORDER BY start_date ASC, name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, template: &RecurringTemplate) -> Result<RecurringTemplate, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let generated = sqlx::query("SELECT COUNT(*) AS count FROM events WHERE template_id = ?")
            .bind(&template.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        if generated.get::<i64, _>("count") > 0 {
            return Err(AppError::Conflict("Template already has generated events; create a new template instead".into()));
        }

        let updated = sqlx::query_as::<_, RecurringTemplate>(
            r#"UPDATE recurring_templates SET
                name=?, title=?, camp_type=?, product_id=?, location_id=?,
                start_date=?, end_date=?, start_time=?, end_time=?, weekday_mask=?
               WHERE id=? RETURNING *"#
        )
            .bind(&template.name)
            .bind(&template.title)
            .bind(&template.camp_type)
            .bind(&template.product_id)
            .bind(&template.location_id)
            .bind(template.start_date)
            .bind(template.end_date)
            .bind(template.start_time)
            .bind(template.end_time)
            .bind(template.weekday_mask)
            .bind(&template.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", template.id)))?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }
}
