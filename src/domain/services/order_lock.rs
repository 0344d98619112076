//! Per-order mutual exclusion for reconciliation.
//!
//! Two layers: an in-process async mutex per order id, and a lease row on the
//! order so separate processes (webhook handler, status poll, sweeper on
//! another node) take turns too.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::OrderRepository;
use crate::error::AppError;

#[derive(Default)]
pub struct OrderLocks {
    inner: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, order_id: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, weak| weak.strong_count() > 0);
            match map.get(order_id).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let created = Arc::new(AsyncMutex::new(()));
                    map.insert(order_id.to_string(), Arc::downgrade(&created));
                    created
                }
            }
        };
        mutex.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|w| w.strong_count() > 0).count()
    }
}

#[derive(Clone, Debug)]
pub struct LeaseSettings {
    /// How long a taken lease stays valid if its holder dies.
    pub ttl: Duration,
    /// How long to wait for someone else's lease before giving up.
    pub wait: Duration,
    pub poll: Duration,
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            wait: Duration::from_secs(10),
            poll: Duration::from_millis(100),
        }
    }
}

/// A held reconciliation lease. Must be handed back with `release`.
pub struct OrderLease {
    pub order_id: String,
    pub owner: String,
}

impl OrderLease {
    pub async fn acquire(
        order_repo: &Arc<dyn OrderRepository>,
        order_id: &str,
        settings: &LeaseSettings,
    ) -> Result<Self, AppError> {
        let owner = Uuid::new_v4().to_string();
        let ttl = chrono::Duration::from_std(settings.ttl)
            .map_err(|e| AppError::Internal(format!("Invalid lease ttl: {}", e)))?;
        let deadline = tokio::time::Instant::now() + settings.wait;

        loop {
            let now = Utc::now();
            if order_repo.try_acquire_lease(order_id, &owner, now + ttl, now).await? {
                debug!(order_id, owner = %owner, "Reconciliation lease acquired");
                return Ok(Self { order_id: order_id.to_string(), owner });
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::ReconciliationBusy(order_id.to_string()));
            }
            tokio::time::sleep(settings.poll).await;
        }
    }

    pub async fn release(self, order_repo: &Arc<dyn OrderRepository>) -> Result<(), AppError> {
        order_repo.release_lease(&self.order_id, &self.owner).await
    }
}
