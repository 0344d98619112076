use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use super::UnknownVariant;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Scheduled,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "SCHEDULED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

impl TryFrom<String> for EventStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "SCHEDULED" => Ok(EventStatus::Scheduled),
            "CANCELLED" => Ok(EventStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "event status", value }),
        }
    }
}

/// A calendar entry. Times are absolute UTC instants; `local_day` is the
/// day both of them fall on in the location's timezone.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: String,
    pub template_id: Option<String>,
    pub product_id: String,
    pub location_id: String,
    pub title: String,
    pub event_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub local_day: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

/// An event the expander wants to exist, not yet persisted.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub template_id: Option<String>,
    pub product_id: String,
    pub location_id: String,
    pub title: String,
    pub event_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub local_day: NaiveDate,
}

impl Event {
    pub fn from_draft(draft: EventDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            template_id: draft.template_id,
            product_id: draft.product_id,
            location_id: draft.location_id,
            title: draft.title,
            event_type: draft.event_type,
            start_time: draft.start_time,
            end_time: draft.end_time,
            local_day: draft.local_day,
            status: EventStatus::Scheduled,
            created_at: Utc::now(),
        }
    }
}
