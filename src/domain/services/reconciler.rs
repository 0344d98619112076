use std::collections::HashMap;
use std::sync::Arc;
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::domain::models::booking::{Booking, BookingStatus, NewBookingParams};
use crate::domain::models::location::Location;
use crate::domain::models::order::{Order, OrderItem, OrderStatus};
use crate::domain::models::reconciliation::{
    ItemReconciliation, ItemStatus, ReconcileIssue, ReconciliationReport,
};
use crate::domain::ports::{BookingRepository, EventRepository, LocationRepository, OrderRepository};
use crate::domain::services::order_lock::{LeaseSettings, OrderLease, OrderLocks};
use crate::domain::services::timezone::{day_bounds, format_day_key, local_day, resolve_timezone};
use crate::error::AppError;

/// Result of trying to give one booking its calendar event.
struct LinkOutcome {
    event_id: Option<String>,
    status: ItemStatus,
    issue: Option<ReconcileIssue>,
}

#[derive(Debug, Serialize, Default)]
pub struct BackfillSummary {
    pub examined: usize,
    pub linked: usize,
    pub still_unlinked: usize,
    pub failed: usize,
}

/// Guarantees "paid item => booking => event" exactly once per order item.
pub struct BookingReconciler {
    order_repo: Arc<dyn OrderRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    event_repo: Arc<dyn EventRepository>,
    location_repo: Arc<dyn LocationRepository>,
    locks: Arc<OrderLocks>,
    lease: LeaseSettings,
}

impl BookingReconciler {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        event_repo: Arc<dyn EventRepository>,
        location_repo: Arc<dyn LocationRepository>,
        locks: Arc<OrderLocks>,
        lease: LeaseSettings,
    ) -> Self {
        Self { order_repo, booking_repo, event_repo, location_repo, locks, lease }
    }

    /// Safe to call any number of times, concurrently, for the same order.
    pub async fn reconcile(&self, order_id: &str) -> Result<ReconciliationReport, AppError> {
        let span = info_span!("reconcile_order", order_id = %order_id);

        async move {
            let _guard = self.locks.lock(order_id).await;

            let order = self.order_repo.find_by_id(order_id).await?
                .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
            if order.status != OrderStatus::Paid {
                return Err(AppError::PaymentNotConfirmed(order.id));
            }

            let lease = OrderLease::acquire(&self.order_repo, &order.id, &self.lease).await?;
            let result = self.reconcile_items(&order).await;
            if let Err(e) = lease.release(&self.order_repo).await {
                warn!("Failed to release reconciliation lease: {}", e);
            }
            result
        }
            .instrument(span)
            .await
    }

    async fn reconcile_items(&self, order: &Order) -> Result<ReconciliationReport, AppError> {
        let mut locations = HashMap::new();
        let mut items = Vec::with_capacity(order.items.len());

        for item in &order.items {
            let outcome = match self.reconcile_item(order, item, &mut locations).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(position = item.position, "Order item could not be reconciled: {}", e);
                    ItemReconciliation {
                        position: item.position,
                        booking_id: None,
                        event_id: None,
                        status: ItemStatus::Failed,
                        issue: Some(ReconcileIssue::Error { message: e.to_string() }),
                    }
                }
            };
            items.push(outcome);
        }

        let report = ReconciliationReport { order_id: order.id.clone(), items };

        if report.is_complete() && order.reconciled_at.is_none() {
            self.order_repo.mark_reconciled(&order.id, Utc::now()).await?;
            info!("Order fully reconciled");
        } else if !report.is_complete() {
            info!(
                unlinked = report.items.iter()
                    .filter(|i| i.event_id.is_none() && i.status != ItemStatus::Cancelled)
                    .count(),
                "Order reconciled with items awaiting remediation"
            );
        }

        Ok(report)
    }

    async fn reconcile_item(
        &self,
        order: &Order,
        item: &OrderItem,
        locations: &mut HashMap<String, Location>,
    ) -> Result<ItemReconciliation, AppError> {
        let location = self.location(&item.location_id, locations).await?;
        let tz = resolve_timezone(&location.timezone)?;
        let day = local_day(item.booking_date, &tz);

        let own = self.booking_repo
            .find_for_order_by_key(&order.id, &item.student_id, &item.product_id, day, &location.id)
            .await?;
        let booking = match own {
            Some(cancelled) if cancelled.status == BookingStatus::Cancelled => {
                debug!(booking_id = %cancelled.id, "Booking was cancelled, not recreating it");
                return Ok(ItemReconciliation {
                    position: item.position,
                    booking_id: Some(cancelled.id),
                    event_id: None,
                    status: ItemStatus::Cancelled,
                    issue: None,
                });
            }
            Some(active) => active,
            None => match self.booking_repo
                .find_active_by_key(&item.student_id, &item.product_id, day, &location.id)
                .await?
            {
                Some(existing) => self.adopt_existing(order, existing).await?,
                None => self.create_booking(order, item, &tz, day).await?,
            },
        };

        let link = match &booking.event_id {
            Some(event_id) => LinkOutcome {
                event_id: Some(event_id.clone()),
                status: if booking.needs_review { ItemStatus::NeedsReview } else { ItemStatus::Linked },
                issue: None,
            },
            None => self.link(&booking, &location).await?,
        };

        Ok(ItemReconciliation {
            position: item.position,
            booking_id: Some(booking.id),
            event_id: link.event_id,
            status: link.status,
            issue: link.issue,
        })
    }

    async fn create_booking(
        &self,
        order: &Order,
        item: &OrderItem,
        tz: &Tz,
        day: chrono::NaiveDate,
    ) -> Result<Booking, AppError> {
        let (start, end) = day_bounds(day, tz)?;
        let booking = Booking::new(NewBookingParams {
            student_id: item.student_id.clone(),
            product_id: item.product_id.clone(),
            location_id: item.location_id.clone(),
            order_id: Some(order.id.clone()),
            start,
            end,
            local_day: day,
            total_price: item.price,
        });

        match self.booking_repo.create(&booking).await {
            Ok(created) => {
                info!(booking_id = %created.id, day = %day, "Booking created");
                Ok(created)
            }
            Err(AppError::DuplicateBookingConflict) => {
                debug!("Booking created concurrently, fetching existing row");
                let existing = self.booking_repo
                    .find_active_by_key(&item.student_id, &item.product_id, day, &item.location_id)
                    .await?
                    .ok_or_else(|| AppError::Internal("Conflicting booking disappeared".into()))?;
                self.adopt_existing(order, existing).await
            }
            Err(e) => Err(e),
        }
    }

    /// Reuses an active booking for the item. A booking that belongs to a
    /// different order means the customer paid twice, so it goes to review.
    async fn adopt_existing(&self, order: &Order, mut existing: Booking) -> Result<Booking, AppError> {
        if existing.order_id.as_deref().is_some_and(|id| id != order.id) {
            warn!(
                booking_id = %existing.id,
                "Item duplicates a booking paid through another order"
            );
            let reason = format!("also purchased in order {}", order.id);
            self.booking_repo.flag_for_review(&existing.id, &reason).await?;
            existing.needs_review = true;
            existing.review_reason = Some(reason);
        }
        Ok(existing)
    }

    async fn link(&self, booking: &Booking, location: &Location) -> Result<LinkOutcome, AppError> {
        let candidates = self.event_repo
            .list_for_day(&booking.product_id, &booking.location_id, booking.local_day)
            .await?;

        if candidates.is_empty() {
            let day = format_day_key(booking.local_day);
            warn!(
                booking_id = %booking.id,
                product_id = %booking.product_id,
                location_id = %booking.location_id,
                day = %day,
                "No calendar event for booking, left unlinked for backfill"
            );
            return Ok(LinkOutcome {
                event_id: None,
                status: ItemStatus::Unlinked,
                issue: Some(ReconcileIssue::EventNotFound { day }),
            });
        }

        for event in &candidates {
            if self.booking_repo.link_event(&booking.id, event, location.capacity).await? {
                info!(booking_id = %booking.id, event_id = %event.id, "Booking linked to event");
                if candidates.len() == 1 {
                    return Ok(LinkOutcome { event_id: Some(event.id.clone()), status: ItemStatus::Linked, issue: None });
                }

                let issue = ReconcileIssue::AmbiguousEvent {
                    chosen: event.id.clone(),
                    candidates: candidates.iter().map(|e| e.id.clone()).collect(),
                };
                warn!(booking_id = %booking.id, "{}", issue.describe());
                self.booking_repo.flag_for_review(&booking.id, &issue.describe()).await?;
                return Ok(LinkOutcome { event_id: Some(event.id.clone()), status: ItemStatus::NeedsReview, issue: Some(issue) });
            }

            // Either someone else linked it first or the event is full.
            if let Some(current) = self.booking_repo.find_by_id(&booking.id).await?
                && let Some(event_id) = current.event_id
            {
                return Ok(LinkOutcome { event_id: Some(event_id), status: ItemStatus::Linked, issue: None });
            }
        }

        let issue = ReconcileIssue::EventAtCapacity { event_id: candidates[0].id.clone() };
        warn!(booking_id = %booking.id, "{}", issue.describe());
        self.booking_repo.flag_for_review(&booking.id, &issue.describe()).await?;
        Ok(LinkOutcome { event_id: None, status: ItemStatus::NeedsReview, issue: Some(issue) })
    }

    async fn location(&self, id: &str, cache: &mut HashMap<String, Location>) -> Result<Location, AppError> {
        if let Some(found) = cache.get(id) {
            return Ok(found.clone());
        }
        let location = self.location_repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound(format!("Location {} not found", id)))?;
        cache.insert(id.to_string(), location.clone());
        Ok(location)
    }

    /// Links active bookings that have no event yet. Never creates bookings.
    /// Bookings flagged for review are left to an operator.
    pub async fn backfill_unlinked(&self, limit: i64) -> Result<BackfillSummary, AppError> {
        let bookings = self.booking_repo.list_unlinked(limit).await?;
        let mut locations = HashMap::new();
        let mut summary = BackfillSummary { examined: bookings.len(), ..Default::default() };

        for booking in bookings {
            if let Err(e) = self.booking_repo.mark_link_attempt(&booking.id, Utc::now()).await {
                warn!(booking_id = %booking.id, "Failed to record link attempt: {}", e);
            }
            let outcome = match self.location(&booking.location_id, &mut locations).await {
                Ok(location) => self.link(&booking, &location).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(LinkOutcome { event_id: Some(_), .. }) => summary.linked += 1,
                Ok(_) => summary.still_unlinked += 1,
                Err(e) => {
                    warn!(booking_id = %booking.id, "Backfill failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        if summary.examined > 0 {
            info!(
                examined = summary.examined,
                linked = summary.linked,
                still_unlinked = summary.still_unlinked,
                "Event link backfill finished"
            );
        }
        Ok(summary)
    }
}
