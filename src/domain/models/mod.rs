pub mod booking;
pub mod cart;
pub mod event;
pub mod location;
pub mod order;
pub mod product;
pub mod reconciliation;
pub mod student;
pub mod template;

use thiserror::Error;

/// A stored status/type column held a value this build does not know.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
