use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Booking exists and is linked to a calendar event.
    Linked,
    /// Booking exists but has no calendar event yet.
    Unlinked,
    /// Booking exists and an operator has to look at its event link.
    NeedsReview,
    /// The order's booking was cancelled by an operator and is not recreated.
    Cancelled,
    /// No booking could be produced for this item.
    Failed,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileIssue {
    EventNotFound { day: String },
    AmbiguousEvent { chosen: String, candidates: Vec<String> },
    EventAtCapacity { event_id: String },
    Error { message: String },
}

impl ReconcileIssue {
    pub fn describe(&self) -> String {
        match self {
            ReconcileIssue::EventNotFound { day } => format!("no calendar event on {}", day),
            ReconcileIssue::AmbiguousEvent { chosen, candidates } => {
                format!("{} candidate events ({}); picked {}", candidates.len(), candidates.join(", "), chosen)
            }
            ReconcileIssue::EventAtCapacity { event_id } => format!("event {} is at capacity", event_id),
            ReconcileIssue::Error { message } => message.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ItemReconciliation {
    pub position: i32,
    pub booking_id: Option<String>,
    pub event_id: Option<String>,
    pub status: ItemStatus,
    pub issue: Option<ReconcileIssue>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ReconciliationReport {
    pub order_id: String,
    pub items: Vec<ItemReconciliation>,
}

impl ReconciliationReport {
    /// Every item has a booking tied to a calendar event, or a booking an
    /// operator cancelled.
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|i| {
            i.status == ItemStatus::Cancelled || (i.booking_id.is_some() && i.event_id.is_some())
        })
    }

    pub fn booking_ids(&self) -> Vec<String> {
        self.items.iter().filter_map(|i| i.booking_id.clone()).collect()
    }
}
