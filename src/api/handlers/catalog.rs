use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{CreateProductRequest, CreateStudentRequest};
use crate::domain::models::{product::Product, student::Student};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.price < 0 {
        return Err(AppError::Validation("Price cannot be negative".into()));
    }
    if payload.product_type.trim().is_empty() {
        return Err(AppError::Validation("Product type is required".into()));
    }
    let created = state.product_repo.create(&Product::new(payload.name, payload.product_type, payload.price)).await?;
    info!(product_id = %created.id, "Product created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.product_repo.list().await?))
}

pub async fn create_student(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    let created = state.student_repo.create(&Student::new(payload.name)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_students(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.student_repo.list().await?))
}
