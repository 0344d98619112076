use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use sqlx::FromRow;
use uuid::Uuid;

/// Every weekday, Monday (bit 0) through Sunday (bit 6).
pub const ALL_WEEKDAYS: i32 = 0b111_1111;
/// Monday to Friday.
pub const WEEKDAYS_ONLY: i32 = 0b001_1111;

pub fn weekday_bit(day: Weekday) -> i32 {
    1 << day.num_days_from_monday()
}

/// Builds a mask from weekday names such as `["mon", "Tuesday"]`.
pub fn mask_from_names(names: &[String]) -> Result<i32, String> {
    names.iter().try_fold(0, |mask, name| {
        name.parse::<Weekday>()
            .map(|d| mask | weekday_bit(d))
            .map_err(|_| format!("Unknown weekday: {}", name))
    })
}

/// Recurrence specification a set of calendar events is expanded from.
/// The window and times of day are local to the location's timezone.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct RecurringTemplate {
    pub id: String,
    pub name: String,
    pub title: String,
    pub camp_type: String,
    pub product_id: String,
    pub location_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub weekday_mask: i32,
    pub created_at: DateTime<Utc>,
}

pub struct NewTemplateParams {
    pub name: String,
    pub title: String,
    pub camp_type: String,
    pub product_id: String,
    pub location_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub weekday_mask: Option<i32>,
}

impl RecurringTemplate {
    pub fn new(params: NewTemplateParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            title: params.title,
            camp_type: params.camp_type.to_uppercase(),
            product_id: params.product_id,
            location_id: params.location_id,
            start_date: params.start_date,
            end_date: params.end_date,
            start_time: params.start_time,
            end_time: params.end_time,
            weekday_mask: params.weekday_mask.unwrap_or(ALL_WEEKDAYS),
            created_at: Utc::now(),
        }
    }

    /// Weekday is the local weekday of the candidate date.
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.weekday_mask & weekday_bit(day) != 0
    }
}
