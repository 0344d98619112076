use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog entry. `product_type` is CAMP, BIRTHDAY, SUBSCRIPTION, ...
/// Prices are in minor currency units.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub product_type: String,
    pub price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: String, product_type: String, price: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            product_type: product_type.to_uppercase(),
            price,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
