use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use crate::state::AppState;
use crate::api::dtos::requests::CalendarParams;
use crate::domain::services::calendar::{generate_ics, CalendarQuery};
use crate::domain::services::timezone::parse_day_key;
use crate::error::AppError;
use std::sync::Arc;

fn to_query(params: CalendarParams) -> Result<CalendarQuery, AppError> {
    Ok(CalendarQuery {
        from: parse_day_key(&params.from)?,
        to: parse_day_key(&params.to)?,
        location_id: params.location_id,
        timezone: params.timezone,
    })
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarParams>,
) -> Result<impl IntoResponse, AppError> {
    let entries = state.calendar_service.list(&to_query(params)?).await?;
    Ok(Json(entries))
}

pub async fn export_ics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarParams>,
) -> Result<impl IntoResponse, AppError> {
    let entries = state.calendar_service.list(&to_query(params)?).await?;
    let body = generate_ics("Camp calendar", &entries);
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"camps.ics\""),
        ],
        body,
    ))
}
