use std::sync::Arc;
use chrono::Utc;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument};
use crate::error::AppError;
use crate::state::AppState;

const SWEEP_BATCH: i64 = 50;
/// Pending orders younger than this are left to the webhook.
const PENDING_GRACE_SECS: i64 = 120;

#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    pub reconciled: usize,
    pub deferred: usize,
    pub payments_checked: usize,
    pub bookings_linked: usize,
}

pub async fn start_reconciliation_sweeper(state: Arc<AppState>) {
    info!(interval_secs = state.config.sweep_interval.as_secs(), "Starting reconciliation sweeper...");

    loop {
        sleep(state.config.sweep_interval).await;

        let span = info_span!("reconciliation_sweep");
        match sweep_once(&state).instrument(span).await {
            Ok(summary) if summary.reconciled + summary.payments_checked + summary.bookings_linked > 0 => {
                info!(?summary, "Sweep finished");
            }
            Ok(_) => {}
            Err(e) => error!("Sweep failed: {:?}", e),
        }
    }
}

/// One pass of the safety net behind webhooks: finishes PAID orders whose
/// reconciliation never completed, asks the gateway about stale PENDING
/// orders, and retries event links for unlinked bookings.
pub async fn sweep_once(state: &AppState) -> Result<SweepSummary, AppError> {
    sweep_batch(state, SWEEP_BATCH).await
}

/// Handles at most `batch` rows of each kind, least recently attempted first.
pub async fn sweep_batch(state: &AppState, batch: i64) -> Result<SweepSummary, AppError> {
    let mut summary = SweepSummary::default();

    for order in state.order_repo.list_unreconciled_paid(batch).await? {
        state.order_repo.mark_reconcile_attempt(&order.id, Utc::now()).await?;
        match state.reconciler.reconcile(&order.id).await {
            Ok(report) if report.is_complete() => summary.reconciled += 1,
            Ok(_) => summary.deferred += 1,
            Err(e) => {
                warn!(order_id = %order.id, "Reconciliation retry failed: {}", e);
                summary.deferred += 1;
            }
        }
    }

    let cutoff = Utc::now() - chrono::Duration::seconds(PENDING_GRACE_SECS);
    for order in state.order_repo.list_pending_before(cutoff, batch).await? {
        match state.payment_service.refresh_status(&order.id).await {
            Ok(_) => summary.payments_checked += 1,
            Err(e) => warn!(order_id = %order.id, "Payment status refresh failed: {}", e),
        }
    }

    let backfill = state.reconciler.backfill_unlinked(batch).await?;
    summary.bookings_linked = backfill.linked;

    Ok(summary)
}
