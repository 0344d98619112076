use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveTime;
use crate::state::AppState;
use crate::api::dtos::requests::{CreateTemplateRequest, UpdateTemplateRequest};
use crate::domain::models::template::{mask_from_names, NewTemplateParams, RecurringTemplate, ALL_WEEKDAYS};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.product_repo.find_by_id(&payload.product_id).await?
        .ok_or(AppError::NotFound("Product not found".into()))?;
    state.location_repo.find_by_id(&payload.location_id).await?
        .ok_or(AppError::NotFound("Location not found".into()))?;

    let template = RecurringTemplate::new(NewTemplateParams {
        name: payload.name,
        title: payload.title,
        camp_type: payload.camp_type,
        product_id: payload.product_id,
        location_id: payload.location_id,
        start_date: payload.start_date,
        end_date: payload.end_date,
        start_time: parse_time_of_day(&payload.start_time)?,
        end_time: parse_time_of_day(&payload.end_time)?,
        weekday_mask: resolve_mask(payload.weekdays.as_deref(), payload.weekday_mask)?,
    });
    validate_window(&template)?;

    let created = state.template_repo.create(&template).await?;
    info!(template_id = %created.id, "Template created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.template_repo.list().await?))
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut template = state.template_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Template not found".into()))?;

    if let Some(v) = payload.name { template.name = v; }
    if let Some(v) = payload.title { template.title = v; }
    if let Some(v) = payload.camp_type { template.camp_type = v.to_uppercase(); }
    if let Some(v) = payload.start_date { template.start_date = v; }
    if let Some(v) = payload.end_date { template.end_date = v; }
    if let Some(v) = payload.start_time { template.start_time = parse_time_of_day(&v)?; }
    if let Some(v) = payload.end_time { template.end_time = parse_time_of_day(&v)?; }
    if let Some(mask) = resolve_mask(payload.weekdays.as_deref(), payload.weekday_mask)? {
        template.weekday_mask = mask;
    }
    validate_window(&template)?;

    let updated = state.template_repo.update(&template).await?;
    info!(template_id = %updated.id, "Template updated");
    Ok(Json(updated))
}

pub async fn expand_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.event_generator.generate(&id).await?;
    Ok(Json(summary))
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("Invalid time '{}' (HH:MM)", raw)))
}

fn resolve_mask(names: Option<&[String]>, mask: Option<i32>) -> Result<Option<i32>, AppError> {
    if let Some(names) = names {
        let mask = mask_from_names(names).map_err(AppError::Validation)?;
        if mask == 0 {
            return Err(AppError::Validation("At least one weekday is required".into()));
        }
        return Ok(Some(mask));
    }
    match mask {
        Some(m) if m <= 0 || m > ALL_WEEKDAYS => Err(AppError::Validation(format!("Weekday mask {} out of range", m))),
        other => Ok(other),
    }
}

fn validate_window(template: &RecurringTemplate) -> Result<(), AppError> {
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
    Ok(())
}
