use crate::domain::{models::template::RecurringTemplate, ports::TemplateRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Row, PgPool};

pub struct PostgresTemplateRepo {
    pool: PgPool,
}

impl PostgresTemplateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for PostgresTemplateRepo {
    async fn create(&self, template: &RecurringTemplate) -> Result<RecurringTemplate, AppError> {
        sqlx::query_as::<_, RecurringTemplate>(
            r#"INSERT INTO recurring_templates (
                id, name, title, camp_type, product_id, location_id,
                start_date, end_date, start_time, end_time, weekday_mask, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
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
        sqlx::query_as::<_, RecurringTemplate>("SELECT * FROM recurring_templates WHERE id = $1")
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

        let generated = sqlx::query("SELECT COUNT(*) AS count FROM events WHERE template_id = $1")
            .bind(&template.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        if generated.get::<i64, _>("count") > 0 {
            return Err(AppError::Conflict("Template already has generated events; create a new template instead".into()));
        }

        let updated = sqlx::query_as::<_, RecurringTemplate>(
            r#"UPDATE recurring_templates SET
                name=$1, title=$2, camp_type=$3, product_id=$4, location_id=$5,
                start_date=$6, end_date=$7, start_time=$8, end_time=$9, weekday_mask=$10
               WHERE id=$11 RETURNING *"#
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
