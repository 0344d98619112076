use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::CheckoutRequest;
use crate::api::extractors::cart_session::CartSession;
use crate::domain::services::checkout::Customer;
use crate::error::AppError;
use std::sync::Arc;

pub async fn checkout(
    State(state): State<Arc<AppState>>,
    CartSession(session_id): CartSession,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let customer = Customer {
        email: payload.customer_email,
        name: payload.customer_name,
    };
    let result = state.checkout_service.checkout(&session_id, customer).await?;
    Ok((StatusCode::CREATED, Json(result)))
}
