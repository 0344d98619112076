use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::responses::OrderResponse;
use crate::error::AppError;
use std::sync::Arc;

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.order_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Order not found".into()))?;
    let bookings = state.booking_repo.list_by_order(&order.id).await?;
    Ok(Json(OrderResponse { order, bookings }))
}

/// Polled by the checkout page until the payment settles.
pub async fn get_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.payment_service.refresh_status(&id).await?;
    Ok(Json(view))
}
