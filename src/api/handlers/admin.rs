use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::LimitParams;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

fn limit(params: &LimitParams) -> i64 {
    params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub async fn list_unlinked_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.booking_repo.list_unlinked(limit(&params)).await?))
}

pub async fn list_review_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.booking_repo.list_needing_review().await?))
}

pub async fn backfill_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.reconciler.backfill_unlinked(limit(&params)).await?;
    Ok(Json(summary))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cancelled = state.booking_repo.cancel(&id).await?;
    info!(booking_id = %cancelled.id, "Booking cancelled by operator");
    Ok(Json(cancelled))
}

/// Re-runs reconciliation for one order. Unpaid orders answer 202.
pub async fn reconcile_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.reconciler.reconcile(&id).await?;
    Ok(Json(report))
}
