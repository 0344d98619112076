use std::sync::Arc;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike, EventStatus as IcalStatus};
use serde::Serialize;

use crate::domain::models::event::{Event, EventStatus};
use crate::domain::ports::{EventRepository, LocationRepository};
use crate::domain::services::timezone::{format_day_key, range_bounds, resolve_timezone};
use crate::error::AppError;

/// Longest range the calendar read API serves in one request.
pub const MAX_RANGE_DAYS: i64 = 366;

#[derive(Debug, Serialize, Clone)]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub local_day: String,
    pub location_id: String,
    pub product_id: String,
    pub status: EventStatus,
}

impl From<Event> for CalendarEntry {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            start_utc: event.start_time,
            end_utc: event.end_time,
            local_day: format_day_key(event.local_day),
            location_id: event.location_id,
            product_id: event.product_id,
            status: event.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalendarQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub location_id: Option<String>,
    pub timezone: Option<String>,
}

pub struct CalendarService {
    event_repo: Arc<dyn EventRepository>,
    location_repo: Arc<dyn LocationRepository>,
    default_tz: Tz,
}

impl CalendarService {
    pub fn new(event_repo: Arc<dyn EventRepository>, location_repo: Arc<dyn LocationRepository>, default_tz: Tz) -> Self {
        Self { event_repo, location_repo, default_tz }
    }

    /// Events whose start falls within the local days `from..=to`.
    ///
    /// The days are read in the requested timezone, else the location's,
    /// else the configured default.
    pub async fn list(&self, query: &CalendarQuery) -> Result<Vec<CalendarEntry>, AppError> {
        if (query.to - query.from).num_days() > MAX_RANGE_DAYS {
            return Err(AppError::Validation(format!("Range is limited to {} days", MAX_RANGE_DAYS)));
        }

        let tz = match (&query.timezone, &query.location_id) {
            (Some(name), _) => resolve_timezone(name)?,
            (None, Some(location_id)) => {
                let location = self.location_repo.find_by_id(location_id).await?
                    .ok_or_else(|| AppError::NotFound(format!("Location {} not found", location_id)))?;
                resolve_timezone(&location.timezone)?
            }
            (None, None) => self.default_tz,
        };

        let (start, end) = range_bounds(query.from, query.to, &tz)?;
        let events = self.event_repo
            .list_by_range(query.location_id.as_deref(), start, end)
            .await?;

        Ok(events.into_iter().map(CalendarEntry::from).collect())
    }
}

/// Renders calendar entries as an iCalendar feed.
pub fn generate_ics(name: &str, entries: &[CalendarEntry]) -> String {
    let mut calendar = Calendar::new();
    calendar.name(name);

    for entry in entries {
        let status = match entry.status {
            EventStatus::Scheduled => IcalStatus::Confirmed,
            EventStatus::Cancelled => IcalStatus::Cancelled,
        };
        let ical_event = IcalEvent::new()
            .uid(&entry.id)
            .summary(&entry.title)
            .location(&entry.location_id)
            .starts(entry.start_utc)
            .ends(entry.end_utc)
            .status(status)
            .done();
        calendar.push(ical_event);
    }

    calendar.done().to_string()
}
