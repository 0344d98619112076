//! Verification and decoding of signed payment webhooks.
//!
//! The `Stripe-Signature` header carries `t=<unix seconds>` and one or more
//! `v1=<hex hmac>` entries; the MAC is HMAC-SHA256 over `"{t}.{raw body}"`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::models::order::PaymentIntent;
use crate::domain::services::payment::{NotificationKind, PaymentNotification};
use crate::error::AppError;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize)]
struct WebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the signature header against the raw body.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> Result<(), AppError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| AppError::Unauthorized("Malformed webhook signature".into()))?;
    if signatures.is_empty() {
        return Err(AppError::Unauthorized("Malformed webhook signature".into()));
    }
    if (now.timestamp() - timestamp).abs() > tolerance_secs {
        return Err(AppError::Unauthorized("Webhook timestamp outside tolerance".into()));
    }

    for candidate in signatures {
        let Ok(expected) = hex::decode(candidate) else { continue };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::Unauthorized("Webhook signature mismatch".into()))
}

/// Decodes a verified body. Event types that do not concern payment intents
/// come back as `NotificationKind::Other` with no intent.
pub fn parse_event(payload: &[u8]) -> Result<Option<PaymentNotification>, AppError> {
    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| AppError::Validation(format!("Invalid webhook body: {}", e)))?;

    let kind = match event.event_type.as_str() {
        "payment_intent.succeeded" => NotificationKind::Succeeded,
        "payment_intent.payment_failed" => NotificationKind::Failed,
        "payment_intent.canceled" => NotificationKind::Canceled,
        other if other.starts_with("payment_intent.") => NotificationKind::Other,
        _ => return Ok(None),
    };

    let payment_intent: PaymentIntent = serde_json::from_value(event.data.object)
        .map_err(|e| AppError::Validation(format!("Invalid payment intent in webhook: {}", e)))?;

    Ok(Some(PaymentNotification { event_id: event.id, kind, payment_intent }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "whsec_test";

    fn body() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_1", "status": "succeeded", "amount": 12000, "currency": "aud"
            }}
        })
        .to_string()
        .into_bytes()
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_767_225_600, 0).unwrap()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = body();
        let ts = now().timestamp();
        let header = format!("t={},v1={}", ts, sign(SECRET, ts, &payload).unwrap());
        assert!(verify_signature(SECRET, &header, &payload, now(), DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn any_matching_v1_entry_is_enough() {
        let payload = body();
        let ts = now().timestamp();
        let header = format!("t={},v1=deadbeef,v1={}", ts, sign(SECRET, ts, &payload).unwrap());
        assert!(verify_signature(SECRET, &header, &payload, now(), DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let payload = body();
        let ts = now().timestamp();
        let header = format!("t={},v1={}", ts, sign(SECRET, ts, &payload).unwrap());
        let mut tampered = payload.clone();
        tampered.extend_from_slice(b" ");
        assert!(matches!(
            verify_signature(SECRET, &header, &tampered, now(), DEFAULT_TOLERANCE_SECS),
            Err(AppError::Unauthorized(_))
        ));
        assert!(verify_signature("whsec_other", &header, &payload, now(), DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = body();
        let ts = now().timestamp() - DEFAULT_TOLERANCE_SECS - 1;
        let header = format!("t={},v1={}", ts, sign(SECRET, ts, &payload).unwrap());
        assert!(verify_signature(SECRET, &header, &payload, now(), DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn malformed_header_is_rejected() {
        let payload = body();
        assert!(verify_signature(SECRET, "garbage", &payload, now(), DEFAULT_TOLERANCE_SECS).is_err());
        assert!(verify_signature(SECRET, "t=1", &payload, now(), DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn events_are_classified() {
        let parsed = parse_event(&body()).unwrap().unwrap();
        assert_eq!(parsed.kind, NotificationKind::Succeeded);
        assert_eq!(parsed.payment_intent.id, "pi_1");
        assert_eq!(parsed.payment_intent.amount, 12000);

        let other = serde_json::json!({"id": "evt_2", "type": "customer.created", "data": {"object": {}}});
        assert!(parse_event(other.to_string().as_bytes()).unwrap().is_none());
    }
}
