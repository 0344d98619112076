use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use rand::{distributions::Alphanumeric, Rng};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: String,
    pub student_id: String,
    pub location_id: String,
    pub booking_date: DateTime<Utc>,
}

/// Cart state for one browsing session. Owned by the request that loaded it
/// and written back through a `CartRepository`.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Cart {
    pub session_id: String,
    pub items: Json<Vec<CartItem>>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(session_id: String) -> Self {
        Self {
            session_id,
            items: Json(Vec::new()),
            updated_at: Utc::now(),
        }
    }

    pub fn new_session_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(40)
            .map(char::from)
            .collect()
    }

    /// Adds an item unless an identical one is already present.
    /// Returns whether the cart changed.
    pub fn add(&mut self, item: CartItem) -> bool {
        if self.items.0.contains(&item) {
            return false;
        }
        self.items.0.push(item);
        self.updated_at = Utc::now();
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<CartItem> {
        if index >= self.items.0.len() {
            return None;
        }
        self.updated_at = Utc::now();
        Some(self.items.0.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.items.0.is_empty()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items.0
    }
}
