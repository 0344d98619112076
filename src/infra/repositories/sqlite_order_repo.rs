use crate::domain::{models::order::{Order, OrderItem, OrderStatus}, ports::OrderRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteOrderRepo {
    pool: SqlitePool,
}

impl SqliteOrderRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn with_items(&self, mut order: Order) -> Result<Order, AppError> {
        order.items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ? ORDER BY position ASC")
            .bind(&order.id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(order)
    }

    async fn all_with_items(&self, orders: Vec<Order>) -> Result<Vec<Order>, AppError> {
        let mut loaded = Vec::with_capacity(orders.len());
        for order in orders {
            loaded.push(self.with_items(order).await?);
        }
        Ok(loaded)
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepo {
    async fn create(&self, order: &Order) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let mut created = sqlx::query_as::<_, Order>(
            r#"INSERT INTO orders (
                id, customer_email, customer_name, total_amount, currency, status,
                payment_intent_id, paid_at, reconciled_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&order.id).bind(&order.customer_email).bind(&order.customer_name)
            .bind(order.total_amount).bind(&order.currency).bind(order.status.as_str())
            .bind(&order.payment_intent_id).bind(order.paid_at).bind(order.reconciled_at).bind(order.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, position, product_id, student_id, location_id, booking_date, price) VALUES (?, ?, ?, ?, ?, ?, ?)"
            )
                .bind(&order.id).bind(item.position).bind(&item.product_id).bind(&item.student_id)
                .bind(&item.location_id).bind(item.booking_date).bind(item.price)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        created.items = order.items.clone();
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        match order {
            Some(order) => Ok(Some(self.with_items(order).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_intent_id = ?")
            .bind(payment_intent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        match order {
            Some(order) => Ok(Some(self.with_items(order).await?)),
            None => Ok(None),
        }
    }

    async fn transition_status(&self, id: &str, next: OrderStatus, at: DateTime<Utc>) -> Result<Option<Order>, AppError> {
        let from = OrderStatus::predecessors(next);
        if from.is_empty() {
            return Ok(None);
        }
        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE orders SET status = ?, paid_at = CASE WHEN ? = 'PAID' THEN ? ELSE paid_at END WHERE id = ? AND status IN ({}) RETURNING *",
            placeholders
        );

        let mut query = sqlx::query_as::<_, Order>(&sql)
            .bind(next.as_str())
            .bind(next.as_str())
            .bind(at)
            .bind(id);
        for status in from {
            query = query.bind(status.as_str());
        }

        let updated = query.fetch_optional(&self.pool).await.map_err(AppError::Database)?;
        match updated {
            Some(order) => Ok(Some(self.with_items(order).await?)),
            None => Ok(None),
        }
    }

    async fn try_acquire_lease(&self, id: &str, owner: &str, until: DateTime<Utc>, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"UPDATE orders SET lease_owner = ?, lease_until = ?
               WHERE id = ? AND (lease_owner IS NULL OR lease_until IS NULL OR lease_until < ? OR lease_owner = ?)"#
        )
            .bind(owner).bind(until)
            .bind(id).bind(now).bind(owner)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_lease(&self, id: &str, owner: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE orders SET lease_owner = NULL, lease_until = NULL WHERE id = ? AND lease_owner = ?")
            .bind(id).bind(owner)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_reconciled(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE orders SET reconciled_at = ? WHERE id = ? AND reconciled_at IS NULL")
            .bind(at).bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_unreconciled_paid(&self, limit: i64) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"SELECT * FROM orders
               WHERE status = 'PAID' AND reconciled_at IS NULL
               ORDER BY last_reconcile_attempt_at ASC NULLS FIRST, paid_at ASC
               LIMIT ?"#
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        self.all_with_items(orders).await
    }

    async fn mark_reconcile_attempt(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE orders SET last_reconcile_attempt_at = ? WHERE id = ?")
            .bind(at).bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_pending_before(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE status = 'PENDING' AND created_at < ? ORDER BY created_at ASC LIMIT ?"
        )
            .bind(before).bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        self.all_with_items(orders).await
    }
}
