use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("Template window invalid: {0}")]
    TemplateWindowInvalid(String),
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("Booking already exists for this student, product, day and location")]
    DuplicateBookingConflict,
    #[error("Payment not confirmed for order {0}")]
    PaymentNotConfirmed(String),
    #[error("Payment gateway unavailable: {0}")]
    PaymentGatewayUnavailable(String),
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),
    #[error("Reconciliation already in progress for order {0}")]
    ReconciliationBusy(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transient failures the caller may retry without changing any state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::PaymentGatewayUnavailable(_) | AppError::ReconciliationBusy(_)
        )
    }
}

/// True for SQLite (2067 unique, 1555 primary key) and PostgreSQL (23505)
/// uniqueness violations.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err.as_database_error() {
        Some(db_err) => {
            if db_err.is_unique_violation() {
                return true;
            }
            let code = db_err.code().unwrap_or_default();
            code == "2067" || code == "1555" || code == "23505"
        }
        None => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                if is_unique_violation(e) {
                    return (
                        StatusCode::CONFLICT,
                        Json(json!({ "error": "Resource already exists (duplicate entry)" })),
                    )
                        .into_response();
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Migration(e) => {
                error!("Migration error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Io(e) => {
                error!("I/O error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidTimezone(_)
            | AppError::TemplateWindowInvalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::LocationUnavailable(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::DuplicateBookingConflict => (StatusCode::CONFLICT, self.to_string()),
            AppError::PaymentNotConfirmed(order_id) => {
                return (
                    StatusCode::ACCEPTED,
                    Json(json!({
                        "order_id": order_id,
                        "status": "PENDING",
                        "message": "Payment not confirmed yet, retry later"
                    })),
                )
                    .into_response();
            }
            AppError::PaymentGatewayUnavailable(msg) | AppError::ReconciliationBusy(msg) => {
                warn!("Transient failure: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::PaymentGateway(msg) => {
                error!("Payment gateway error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment provider error".to_string())
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
