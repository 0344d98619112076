use crate::domain::{models::product::Product, ports::ProductRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteProductRepo {
    pool: SqlitePool,
}

impl SqliteProductRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepo {
    async fn create(&self, product: &Product) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            "INSERT INTO products (id, name, product_type, price, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&product.id)
            .bind(&product.name)
            .bind(&product.product_type)
            .bind(product.price)
            .bind(product.is_active)
            .bind(product.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Product>, AppError> {
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
