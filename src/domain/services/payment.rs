use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::models::order::{Order, OrderStatus, PaymentIntent};
use crate::domain::models::reconciliation::ReconciliationReport;
use crate::domain::ports::{OrderRepository, PaymentGateway};
use crate::domain::services::reconciler::BookingReconciler;
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Retries `op` while it fails with a transient error, with exponential backoff.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "{} failed transiently: {}", what, e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Succeeded,
    Failed,
    Canceled,
    Other,
}

/// A verified payment notification from the gateway.
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    pub event_id: String,
    pub kind: NotificationKind,
    pub payment_intent: PaymentIntent,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentLookup {
    /// The gateway answered.
    Checked,
    /// The order was already settled locally.
    Skipped,
    /// The gateway could not be reached; nothing was changed.
    Unavailable,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusView {
    pub order: Order,
    pub payment_lookup: PaymentLookup,
    pub reconciliation: Option<ReconciliationReport>,
}

#[derive(Debug, Serialize)]
pub struct WebhookOutcome {
    pub handled: bool,
    pub order_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub reconciliation: Option<ReconciliationReport>,
}

impl WebhookOutcome {
    fn ignored() -> Self {
        Self { handled: false, order_id: None, status: None, reconciliation: None }
    }
}

/// Drives orders through PENDING -> PAID | FAILED. Only verified webhooks and
/// the gateway's own retrieve call may move an order.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    order_repo: Arc<dyn OrderRepository>,
    reconciler: Arc<BookingReconciler>,
    retry: RetryPolicy,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        order_repo: Arc<dyn OrderRepository>,
        reconciler: Arc<BookingReconciler>,
        retry: RetryPolicy,
    ) -> Self {
        Self { gateway, order_repo, reconciler, retry }
    }

    pub async fn handle_notification(&self, notification: PaymentNotification) -> Result<WebhookOutcome, AppError> {
        let intent = &notification.payment_intent;
        let next = match notification.kind {
            NotificationKind::Succeeded => OrderStatus::Paid,
            NotificationKind::Failed | NotificationKind::Canceled => OrderStatus::Failed,
            NotificationKind::Other => return Ok(WebhookOutcome::ignored()),
        };

        let Some(order) = self.order_repo.find_by_payment_intent(&intent.id).await? else {
            warn!(event_id = %notification.event_id, payment_intent = %intent.id, "Webhook for unknown payment intent");
            return Ok(WebhookOutcome::ignored());
        };

        info!(
            event_id = %notification.event_id,
            order_id = %order.id,
            kind = ?notification.kind,
            "Payment notification received"
        );

        let order = self.apply(&order, intent, next).await?;
        let reconciliation = self.reconcile_if_paid(&order).await;

        Ok(WebhookOutcome {
            handled: true,
            order_id: Some(order.id.clone()),
            status: Some(order.status),
            reconciliation,
        })
    }

    /// Order status for polling clients. Asks the gateway when the order is
    /// not yet PAID; a gateway outage leaves the order untouched.
    pub async fn refresh_status(&self, order_id: &str) -> Result<OrderStatusView, AppError> {
        let mut order = self.order_repo.find_by_id(order_id).await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        let mut lookup = PaymentLookup::Skipped;
        if order.status != OrderStatus::Paid {
            let gateway = self.gateway.clone();
            let intent_id = order.payment_intent_id.clone();
            let retrieved = with_retry(&self.retry, "Payment intent lookup", || {
                let gateway = gateway.clone();
                let intent_id = intent_id.clone();
                async move { gateway.retrieve_payment_intent(&intent_id).await }
            })
            .await;

            match retrieved {
                Ok(intent) => {
                    lookup = PaymentLookup::Checked;
                    if let Some(next) = intent.status.settled_order_status() {
                        order = self.apply(&order, &intent, next).await?;
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(order_id = %order.id, "Payment gateway unavailable, status unchanged: {}", e);
                    lookup = PaymentLookup::Unavailable;
                }
                Err(e) => return Err(e),
            }
        }

        let reconciliation = self.reconcile_if_paid(&order).await;
        Ok(OrderStatusView { order, payment_lookup: lookup, reconciliation })
    }

    async fn apply(&self, order: &Order, intent: &PaymentIntent, next: OrderStatus) -> Result<Order, AppError> {
        if intent.id != order.payment_intent_id {
            return Err(AppError::PaymentGateway(format!(
                "Payment intent {} does not belong to order {}",
                intent.id, order.id
            )));
        }
        if next == OrderStatus::Paid && intent.amount != order.total_amount {
            error!(
                order_id = %order.id,
                expected = order.total_amount,
                received = intent.amount,
                "Payment amount mismatch, order left unpaid"
            );
            return Err(AppError::Conflict(format!("Payment amount mismatch for order {}", order.id)));
        }

        if order.status == next {
            return Ok(order.clone());
        }
        if !order.status.can_transition_to(next) {
            warn!(
                order_id = %order.id,
                from = order.status.as_str(),
                to = next.as_str(),
                "Ignoring illegal order transition"
            );
            return Ok(order.clone());
        }

        match self.order_repo.transition_status(&order.id, next, Utc::now()).await? {
            Some(updated) => {
                info!(order_id = %updated.id, status = updated.status.as_str(), "Order status changed");
                Ok(updated)
            }
            None => self.order_repo.find_by_id(&order.id).await?
                .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.id))),
        }
    }

    async fn reconcile_if_paid(&self, order: &Order) -> Option<ReconciliationReport> {
        if order.status != OrderStatus::Paid {
            return None;
        }
        match self.reconciler.reconcile(&order.id).await {
            Ok(report) => Some(report),
            Err(e) => {
                // The sweeper picks the order up again.
                warn!(order_id = %order.id, "Reconciliation deferred: {}", e);
                None
            }
        }
    }
}
