use std::collections::HashSet;
use std::sync::Arc;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::models::event::{Event, EventDraft};
use crate::domain::models::location::Location;
use crate::domain::models::template::RecurringTemplate;
use crate::domain::ports::{EventRepository, LocationRepository, TemplateRepository};
use crate::domain::services::timezone::{local_day, local_days, local_instant, resolve_timezone};
use crate::error::AppError;

pub const CAMP_EVENT_TYPE: &str = "CAMP";

/// Concrete events a template still needs at its location.
///
/// `existing_days` are local days the template already has events for at
/// this location; they are skipped so re-running only fills gaps.
pub fn expand(
    template: &RecurringTemplate,
    location: &Location,
    existing_days: &HashSet<NaiveDate>,
) -> Result<Vec<EventDraft>, AppError> {
    if template.start_date > template.end_date {
        return Err(AppError::TemplateWindowInvalid(format!(
            "start date {} is after end date {}",
            template.start_date, template.end_date
        )));
    }
    if template.start_time >= template.end_time {
        return Err(AppError::TemplateWindowInvalid(format!(
            "start time {} is not before end time {}",
            template.start_time, template.end_time
        )));
    }
    if !location.is_active {
        return Err(AppError::LocationUnavailable(format!("location {} is inactive", location.id)));
    }
    if !location.offers_camp_type(&template.camp_type) {
        return Err(AppError::LocationUnavailable(format!(
            "location {} does not run {} camps",
            location.id, template.camp_type
        )));
    }

    let tz = resolve_timezone(&location.timezone)?;
    let mut drafts = Vec::new();

    for day in local_days(template.start_date, template.end_date) {
        if !location.is_open_on(day) || !template.runs_on(day.weekday()) || existing_days.contains(&day) {
            continue;
        }

        let start = local_instant(day, template.start_time, &tz)?;
        let end = local_instant(day, template.end_time, &tz)?;

        if start >= end || local_day(start, &tz) != day || local_day(end, &tz) != day {
            warn!(
                template_id = %template.id,
                day = %day,
                "Skipping day: local window does not map to a single local day"
            );
            continue;
        }

        drafts.push(EventDraft {
            template_id: Some(template.id.clone()),
            product_id: template.product_id.clone(),
            location_id: location.id.clone(),
            title: template.title.clone(),
            event_type: CAMP_EVENT_TYPE.to_string(),
            start_time: start,
            end_time: end,
            local_day: day,
        });
    }

    Ok(drafts)
}

#[derive(Debug, Serialize)]
pub struct GenerationSummary {
    pub template_id: String,
    pub created: Vec<Event>,
    pub skipped_existing: usize,
}

/// Materializes a template's drafts. Inserts are guarded by the store's
/// unique (template, location, local day) key, so concurrent or repeated
/// runs converge on one event per day.
pub struct EventGenerator {
    template_repo: Arc<dyn TemplateRepository>,
    location_repo: Arc<dyn LocationRepository>,
    event_repo: Arc<dyn EventRepository>,
}

impl EventGenerator {
    pub fn new(
        template_repo: Arc<dyn TemplateRepository>,
        location_repo: Arc<dyn LocationRepository>,
        event_repo: Arc<dyn EventRepository>,
    ) -> Self {
        Self { template_repo, location_repo, event_repo }
    }

    pub async fn generate(&self, template_id: &str) -> Result<GenerationSummary, AppError> {
        let template = self.template_repo.find_by_id(template_id).await?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", template_id)))?;
        let location = self.location_repo.find_by_id(&template.location_id).await?
            .ok_or_else(|| AppError::NotFound(format!("Location {} not found", template.location_id)))?;

        let existing_days: HashSet<NaiveDate> = self.event_repo.list_by_template(&template.id).await?
            .into_iter()
            .filter(|e| e.location_id == location.id)
            .map(|e| e.local_day)
            .collect();

        let drafts = expand(&template, &location, &existing_days)?;
        let mut created = Vec::with_capacity(drafts.len());
        let mut raced = 0;

        for draft in drafts {
            let event = Event::from_draft(draft);
            match self.event_repo.insert_if_absent(&event).await? {
                Some(inserted) => created.push(inserted),
                None => raced += 1,
            }
        }

        info!(
            template_id = %template.id,
            created = created.len(),
            existing = existing_days.len() + raced,
            "Template expanded"
        );

        Ok(GenerationSummary {
            template_id: template.id,
            created,
            skipped_existing: existing_days.len() + raced,
        })
    }
}
