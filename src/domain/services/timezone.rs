//! Conversions between stored UTC instants and a location's local calendar.
//!
//! Day keys are always derived with a real timezone database lookup. Slicing
//! the date off a UTC ISO string gives the wrong day for any instant whose
//! local date differs from its UTC date (Sydney evenings, for one).

use crate::error::AppError;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

// DST gaps are at most a couple of hours; probe far enough for any zone.
const GAP_PROBE_STEP_MIN: i64 = 15;
const GAP_PROBE_STEPS: i64 = 4 * 24;

pub fn resolve_timezone(name: &str) -> Result<Tz, AppError> {
    name.parse::<Tz>()
        .map_err(|_| AppError::InvalidTimezone(name.to_string()))
}

pub fn parse_day_key(key: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(key, DAY_KEY_FORMAT)
        .map_err(|_| AppError::Validation(format!("Invalid day key '{}', expected YYYY-MM-DD", key)))
}

pub fn format_day_key(day: NaiveDate) -> String {
    day.format(DAY_KEY_FORMAT).to_string()
}

/// Calendar date `instant` falls on in `tz`.
pub fn local_day(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

pub fn to_local_day_key(instant: DateTime<Utc>, timezone: &str) -> Result<String, AppError> {
    let tz = resolve_timezone(timezone)?;
    Ok(format_day_key(local_day(instant, &tz)))
}

/// UTC instant for a local wall-clock time.
///
/// An ambiguous time (clocks going back) resolves to the earlier instant. A
/// time inside a gap (clocks going forward) resolves to the first instant
/// after the gap.
pub fn local_instant(day: NaiveDate, time: NaiveTime, tz: &Tz) -> Result<DateTime<Utc>, AppError> {
    let naive = day.and_time(time);
    resolve_local(tz, naive).ok_or_else(|| {
        AppError::Internal(format!("No valid instant near {} in {}", naive, tz.name()))
    })
}

fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => (1..=GAP_PROBE_STEPS)
            .find_map(|step| {
                let probe = naive + Duration::minutes(step * GAP_PROBE_STEP_MIN);
                tz.from_local_datetime(&probe).earliest()
            })
            .map(|t| t.with_timezone(&Utc)),
    }
}

/// `[start, end)` of a local calendar day as UTC instants.
pub fn day_bounds(day: NaiveDate, tz: &Tz) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let next = day
        .succ_opt()
        .ok_or_else(|| AppError::Validation(format!("Day {} is out of range", day)))?;
    let start = local_instant(day, NaiveTime::MIN, tz)?;
    let end = local_instant(next, NaiveTime::MIN, tz)?;
    Ok((start, end))
}

pub fn local_day_bounds(day_key: &str, timezone: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let tz = resolve_timezone(timezone)?;
    day_bounds(parse_day_key(day_key)?, &tz)
}

/// `[start, end)` covering the local days `first..=last`.
pub fn range_bounds(first: NaiveDate, last: NaiveDate, tz: &Tz) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    if first > last {
        return Err(AppError::Validation(format!("Range start {} is after end {}", first, last)));
    }
    let (start, _) = day_bounds(first, tz)?;
    let (_, end) = day_bounds(last, tz)?;
    Ok((start, end))
}

pub fn is_same_local_day(a: DateTime<Utc>, b: DateTime<Utc>, timezone: &str) -> Result<bool, AppError> {
    let tz = resolve_timezone(timezone)?;
    Ok(local_day(a, &tz) == local_day(b, &tz))
}

/// Local dates `first..=last`, empty when `first > last`.
pub fn local_days(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    first.iter_days().take_while(move |d| *d <= last)
}
