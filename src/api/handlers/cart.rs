use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use crate::state::AppState;
use crate::api::dtos::requests::AddCartItemRequest;
use crate::api::dtos::responses::CartResponse;
use crate::api::extractors::cart_session::CartSession;
use crate::domain::models::cart::{Cart, CartItem};
use crate::domain::services::timezone::{day_bounds, parse_day_key, resolve_timezone};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

async fn load_cart(state: &AppState, session_id: &str) -> Result<Cart, AppError> {
    Ok(state.cart_repo.load(session_id).await?
        .unwrap_or_else(|| Cart::empty(session_id.to_string())))
}

pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    CartSession(session_id): CartSession,
) -> Result<impl IntoResponse, AppError> {
    let cart = load_cart(&state, &session_id).await?;
    Ok(Json(CartResponse::new(cart.items())))
}

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    CartSession(session_id): CartSession,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.product_repo.find_by_id(&payload.product_id).await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound("Product not found".into()))?;
    state.student_repo.find_by_id(&payload.student_id).await?
        .ok_or(AppError::NotFound("Student not found".into()))?;
    let location = state.location_repo.find_by_id(&payload.location_id).await?
        .ok_or(AppError::NotFound("Location not found".into()))?;

    let booking_date = match DateTime::parse_from_rfc3339(&payload.booking_date) {
        Ok(instant) => instant.with_timezone(&Utc),
        Err(_) => {
            // A bare day means that day at the location.
            let tz = resolve_timezone(&location.timezone)?;
            day_bounds(parse_day_key(&payload.booking_date)?, &tz)?.0
        }
    };

    let mut cart = load_cart(&state, &session_id).await?;
    let added = cart.add(CartItem {
        product_id: payload.product_id,
        student_id: payload.student_id,
        location_id: location.id,
        booking_date,
    });
    if added {
        state.cart_repo.save(&cart).await?;
        info!(items = cart.items().len(), "Cart item added");
    }

    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(CartResponse::new(cart.items()))))
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    CartSession(session_id): CartSession,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    let mut cart = load_cart(&state, &session_id).await?;
    cart.remove(index).ok_or(AppError::NotFound("Cart item not found".into()))?;
    state.cart_repo.save(&cart).await?;
    Ok(Json(CartResponse::new(cart.items())))
}

pub async fn clear_cart(
    State(state): State<Arc<AppState>>,
    CartSession(session_id): CartSession,
) -> Result<impl IntoResponse, AppError> {
    state.cart_repo.delete(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
