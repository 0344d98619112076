use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use super::UnknownVariant;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed => "FAILED",
        }
    }

    /// PENDING -> PAID | FAILED. A FAILED order may still become PAID when
    /// the customer retries the same payment intent. PAID is terminal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Failed, OrderStatus::Paid)
        )
    }

    /// States an order may be in for a move to `next` to apply.
    pub fn predecessors(next: OrderStatus) -> &'static [OrderStatus] {
        match next {
            OrderStatus::Paid => &[OrderStatus::Pending, OrderStatus::Failed],
            OrderStatus::Failed => &[OrderStatus::Pending],
            OrderStatus::Pending => &[],
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "FAILED" => Ok(OrderStatus::Failed),
            _ => Err(UnknownVariant { kind: "order status", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct OrderItem {
    pub order_id: String,
    pub position: i32,
    pub product_id: String,
    pub student_id: String,
    pub location_id: String,
    pub booking_date: DateTime<Utc>,
    pub price: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Order {
    pub id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub total_amount: i64,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub payment_intent_id: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub reconciled_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub lease_owner: Option<String>,
    #[serde(skip)]
    pub lease_until: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub last_reconcile_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

pub struct NewOrderItem {
    pub product_id: String,
    pub student_id: String,
    pub location_id: String,
    pub booking_date: DateTime<Utc>,
    pub price: i64,
}

impl Order {
    /// Builds a PENDING order. The id is chosen up front so it can be used as
    /// the payment idempotency key before the row exists.
    pub fn new(
        id: String,
        customer_email: String,
        customer_name: String,
        currency: String,
        payment_intent_id: String,
        items: Vec<NewOrderItem>,
    ) -> Self {
        let items: Vec<OrderItem> = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| OrderItem {
                order_id: id.clone(),
                position: i as i32,
                product_id: item.product_id,
                student_id: item.student_id,
                location_id: item.location_id,
                booking_date: item.booking_date,
                price: item.price,
            })
            .collect();

        Self {
            total_amount: items.iter().map(|i| i.price).sum(),
            id,
            customer_email,
            customer_name,
            currency,
            status: OrderStatus::Pending,
            payment_intent_id,
            paid_at: None,
            reconciled_at: None,
            lease_owner: None,
            lease_until: None,
            last_reconcile_attempt_at: None,
            created_at: Utc::now(),
            items,
        }
    }

    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
}

impl PaymentIntentStatus {
    /// The order state a gateway status settles to, if it is final.
    pub fn settled_order_status(&self) -> Option<OrderStatus> {
        match self {
            PaymentIntentStatus::Succeeded => Some(OrderStatus::Paid),
            PaymentIntentStatus::Canceled => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub status: PaymentIntentStatus,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}
