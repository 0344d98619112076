use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};
use chrono::Utc;
use crate::state::AppState;
use crate::infra::payment::stripe_webhook::{parse_event, verify_signature, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
use crate::error::AppError;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers.get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".into()))?;

    if let Err(e) = verify_signature(&state.config.stripe_webhook_secret, signature, &body, Utc::now(), DEFAULT_TOLERANCE_SECS) {
        warn!("Rejected webhook: {}", e);
        return Err(e);
    }

    let Some(notification) = parse_event(&body)? else {
        debug!("Ignoring non-payment webhook");
        return Ok(Json(json!({ "received": true, "handled": false })));
    };

    let outcome = state.payment_service.handle_notification(notification).await?;
    Ok(Json(json!({ "received": true, "handled": outcome.handled, "outcome": outcome })))
}
