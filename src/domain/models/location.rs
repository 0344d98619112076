use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub address: String,
    pub capacity: i32,
    pub timezone: String,
    pub is_active: bool,
    /// Camp types this venue runs. `None` means any.
    pub allowed_camp_types: Option<Json<Vec<String>>>,
    /// Explicit local dates the venue is open. `None` means every date.
    pub allowed_dates: Option<Json<Vec<NaiveDate>>>,
    pub created_at: DateTime<Utc>,
}

pub struct NewLocationParams {
    pub name: String,
    pub address: String,
    pub capacity: i32,
    pub timezone: String,
    pub allowed_camp_types: Option<Vec<String>>,
    pub allowed_dates: Option<Vec<NaiveDate>>,
}

impl Location {
    pub fn new(params: NewLocationParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            address: params.address,
            capacity: params.capacity,
            timezone: params.timezone,
            is_active: true,
            allowed_camp_types: params.allowed_camp_types.map(Json),
            allowed_dates: params.allowed_dates.map(Json),
            created_at: Utc::now(),
        }
    }

    pub fn offers_camp_type(&self, camp_type: &str) -> bool {
        match &self.allowed_camp_types {
            Some(Json(types)) => types.iter().any(|t| t.eq_ignore_ascii_case(camp_type)),
            None => true,
        }
    }

    pub fn is_open_on(&self, day: NaiveDate) -> bool {
        match &self.allowed_dates {
            Some(Json(dates)) => dates.contains(&day),
            None => true,
        }
    }
}
