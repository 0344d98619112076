pub mod calendar;
pub mod checkout;
pub mod order_lock;
pub mod payment;
pub mod reconciler;
pub mod recurrence;
pub mod timezone;
