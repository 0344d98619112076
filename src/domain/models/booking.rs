use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use super::UnknownVariant;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "NO_SHOW" => Ok(BookingStatus::NoShow),
            _ => Err(UnknownVariant { kind: "booking status", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub student_id: String,
    pub product_id: String,
    pub location_id: String,
    pub order_id: Option<String>,
    /// Weak reference; the event outlives any single booking.
    pub event_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub local_day: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub total_price: i64,
    pub needs_review: bool,
    pub review_reason: Option<String>,
    #[serde(skip)]
    pub last_link_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub student_id: String,
    pub product_id: String,
    pub location_id: String,
    pub order_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub local_day: NaiveDate,
    pub total_price: i64,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_id: params.student_id,
            product_id: params.product_id,
            location_id: params.location_id,
            order_id: params.order_id,
            event_id: None,
            start_time: params.start,
            end_time: params.end,
            local_day: params.local_day,
            status: BookingStatus::Confirmed,
            total_price: params.total_price,
            needs_review: false,
            review_reason: None,
            last_link_attempt_at: None,
            created_at: Utc::now(),
        }
    }
}
