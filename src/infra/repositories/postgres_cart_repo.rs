use crate::domain::{models::cart::Cart, ports::CartRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresCartRepo {
    pool: PgPool,
}

impl PostgresCartRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PostgresCartRepo {
    async fn load(&self, session_id: &str) -> Result<Option<Cart>, AppError> {
        sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn save(&self, cart: &Cart) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO carts (session_id, items, updated_at) VALUES ($1, $2, $3)
               ON CONFLICT(session_id) DO UPDATE SET items = excluded.items, updated_at = excluded.updated_at"#
        )
            .bind(&cart.session_id)
            .bind(&cart.items)
            .bind(cart.updated_at)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM carts WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
