use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{CreateLocationRequest, UpdateLocationRequest};
use crate::domain::models::location::{Location, NewLocationParams};
use crate::domain::services::timezone::resolve_timezone;
use crate::error::AppError;
use sqlx::types::Json as SqlJson;
use std::sync::Arc;
use tracing::info;

pub async fn create_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    resolve_timezone(&payload.timezone)?;
    if payload.capacity <= 0 {
        return Err(AppError::Validation("Capacity must be positive".into()));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    let location = Location::new(NewLocationParams {
        name: payload.name,
        address: payload.address,
        capacity: payload.capacity,
        timezone: payload.timezone,
        allowed_camp_types: payload.allowed_camp_types,
        allowed_dates: payload.allowed_dates,
    });
    let created = state.location_repo.create(&location).await?;
    info!(location_id = %created.id, timezone = %created.timezone, "Location created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_locations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.location_repo.list().await?))
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut location = state.location_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Location not found".into()))?;

    if let Some(tz) = payload.timezone {
        resolve_timezone(&tz)?;
        location.timezone = tz;
    }
    if let Some(capacity) = payload.capacity {
        if capacity <= 0 {
            return Err(AppError::Validation("Capacity must be positive".into()));
        }
        location.capacity = capacity;
    }
    if let Some(v) = payload.name { location.name = v; }
    if let Some(v) = payload.address { location.address = v; }
    if let Some(v) = payload.is_active { location.is_active = v; }
    if let Some(v) = payload.allowed_camp_types { location.allowed_camp_types = Some(SqlJson(v)); }
    if let Some(v) = payload.allowed_dates { location.allowed_dates = Some(SqlJson(v)); }

    let updated = state.location_repo.update(&location).await?;
    info!(location_id = %updated.id, "Location updated");
    Ok(Json(updated))
}

pub async fn delete_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.location_repo.delete(&id).await?;
    info!("Deleted location: {}", id);
    Ok(Json(serde_json::json!({"status": "deleted"})))
}
