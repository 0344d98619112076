use crate::domain::{models::{booking::Booking, event::Event}, ports::BookingRepository};
use crate::error::{is_unique_violation, AppError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings (
                id, student_id, product_id, location_id, order_id, event_id, start_time, end_time,
                local_day, status, total_price, needs_review, review_reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&booking.id).bind(&booking.student_id).bind(&booking.product_id).bind(&booking.location_id)
            .bind(&booking.order_id).bind(&booking.event_id).bind(booking.start_time).bind(booking.end_time)
            .bind(booking.local_day).bind(booking.status.as_str()).bind(booking.total_price)
            .bind(booking.needs_review).bind(&booking.review_reason).bind(booking.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| if is_unique_violation(&e) { AppError::DuplicateBookingConflict } else { AppError::Database(e) })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_active_by_key(&self, student_id: &str, product_id: &str, day: NaiveDate, location_id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE student_id = ? AND product_id = ? AND local_day = ? AND location_id = ? AND status != 'CANCELLED'"
        )
            .bind(student_id).bind(product_id).bind(day).bind(location_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_for_order_by_key(
        &self,
        order_id: &str,
        student_id: &str,
        product_id: &str,
        day: NaiveDate,
        location_id: &str,
    ) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE order_id = ? AND student_id = ? AND product_id = ? AND local_day = ? AND location_id = ?
               ORDER BY status = 'CANCELLED' ASC, created_at DESC
               LIMIT 1"#
        )
            .bind(order_id).bind(student_id).bind(product_id).bind(day).bind(location_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY local_day ASC, created_at ASC").fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_order(&self, order_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE order_id = ? ORDER BY created_at ASC").bind(order_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_unlinked(&self, limit: i64) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE event_id IS NULL AND status IN ('PENDING', 'CONFIRMED') AND needs_review = FALSE
               ORDER BY last_link_attempt_at ASC NULLS FIRST, created_at ASC
               LIMIT ?"#
        )
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn mark_link_attempt(&self, booking_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE bookings SET last_link_attempt_at = ? WHERE id = ?")
            .bind(at).bind(booking_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_needing_review(&self) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE needs_review = TRUE AND status != 'CANCELLED' ORDER BY created_at ASC"
        )
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn link_event(&self, booking_id: &str, event: &Event, capacity: i32) -> Result<bool, AppError> {
        // SQLite serializes writers, so the capacity count and the update are atomic.
        let result = sqlx::query(
            r#"UPDATE bookings SET event_id = ?, start_time = ?, end_time = ?
               WHERE id = ? AND event_id IS NULL AND status != 'CANCELLED'
                 AND (SELECT COUNT(*) FROM bookings WHERE event_id = ? AND status != 'CANCELLED') < ?"#
        )
            .bind(&event.id).bind(event.start_time).bind(event.end_time)
            .bind(booking_id)
            .bind(&event.id).bind(capacity)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn flag_for_review(&self, booking_id: &str, reason: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE bookings SET needs_review = TRUE, review_reason = ? WHERE id = ?")
            .bind(reason).bind(booking_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>("UPDATE bookings SET status = 'CANCELLED' WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))
    }
}
