use crate::domain::models::{
    booking::Booking, cart::Cart, event::Event, location::Location,
    order::{Order, OrderStatus, PaymentIntent}, product::Product, student::Student,
    template::RecurringTemplate,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, location: &Location) -> Result<Location, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Location>, AppError>;
    async fn list(&self) -> Result<Vec<Location>, AppError>;
    async fn update(&self, location: &Location) -> Result<Location, AppError>;
    /// Refuses with `Conflict` while bookings reference the location.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> Result<Product, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError>;
    async fn list(&self) -> Result<Vec<Product>, AppError>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create(&self, student: &Student) -> Result<Student, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Student>, AppError>;
    async fn list(&self) -> Result<Vec<Student>, AppError>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create(&self, template: &RecurringTemplate) -> Result<RecurringTemplate, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<RecurringTemplate>, AppError>;
    async fn list(&self) -> Result<Vec<RecurringTemplate>, AppError>;
    async fn update(&self, template: &RecurringTemplate) -> Result<RecurringTemplate, AppError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    /// Inserts unless an event already exists for the same
    /// (template, location, local day). Returns the row only when inserted.
    async fn insert_if_absent(&self, event: &Event) -> Result<Option<Event>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn list_by_template(&self, template_id: &str) -> Result<Vec<Event>, AppError>;
    /// Non-cancelled events for the product at the location on the local day, by id.
    async fn list_for_day(&self, product_id: &str, location_id: &str, day: NaiveDate) -> Result<Vec<Event>, AppError>;
    async fn list_by_range(&self, location_id: Option<&str>, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Event>, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fails with `DuplicateBookingConflict` when an active booking with the
    /// same (student, product, local day, location) exists.
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_active_by_key(&self, student_id: &str, product_id: &str, day: NaiveDate, location_id: &str) -> Result<Option<Booking>, AppError>;
    /// The order's own booking for the key in any status, active rows first.
    async fn find_for_order_by_key(
        &self,
        order_id: &str,
        student_id: &str,
        product_id: &str,
        day: NaiveDate,
        location_id: &str,
    ) -> Result<Option<Booking>, AppError>;
    async fn list(&self) -> Result<Vec<Booking>, AppError>;
    async fn list_by_order(&self, order_id: &str) -> Result<Vec<Booking>, AppError>;
    /// Active bookings without an event that are not waiting on an operator,
    /// least recently attempted first.
    async fn list_unlinked(&self, limit: i64) -> Result<Vec<Booking>, AppError>;
    async fn mark_link_attempt(&self, booking_id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn list_needing_review(&self) -> Result<Vec<Booking>, AppError>;
    /// Links the booking to the event only while the booking is unlinked and
    /// the event holds fewer than `capacity` active bookings.
    async fn link_event(&self, booking_id: &str, event: &Event, capacity: i32) -> Result<bool, AppError>;
    async fn flag_for_review(&self, booking_id: &str, reason: &str) -> Result<(), AppError>;
    async fn cancel(&self, id: &str) -> Result<Booking, AppError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order and its items in one transaction.
    async fn create(&self, order: &Order) -> Result<Order, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, AppError>;
    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, AppError>;
    /// Applies `next` only from one of its legal predecessor states. Returns
    /// the updated order, or `None` when the stored state did not allow it.
    async fn transition_status(&self, id: &str, next: OrderStatus, at: DateTime<Utc>) -> Result<Option<Order>, AppError>;
    /// Takes the reconciliation lease unless a live one is held by someone else.
    async fn try_acquire_lease(&self, id: &str, owner: &str, until: DateTime<Utc>, now: DateTime<Utc>) -> Result<bool, AppError>;
    async fn release_lease(&self, id: &str, owner: &str) -> Result<(), AppError>;
    async fn mark_reconciled(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
    /// Least recently retried first, so orders that stay stuck do not hide newer ones.
    async fn list_unreconciled_paid(&self, limit: i64) -> Result<Vec<Order>, AppError>;
    async fn mark_reconcile_attempt(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn list_pending_before(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<Order>, AppError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Cart>, AppError>;
    async fn save(&self, cart: &Cart) -> Result<(), AppError>;
    async fn delete(&self, session_id: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct CreatePaymentIntent {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt_email: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Idempotent per `order_id`.
    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent, AppError>;
    /// Timeouts and connection failures are `PaymentGatewayUnavailable`.
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError>;
}
