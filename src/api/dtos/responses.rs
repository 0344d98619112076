use serde::Serialize;
use crate::domain::models::booking::Booking;
use crate::domain::models::cart::CartItem;
use crate::domain::models::order::Order;

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub count: usize,
}

impl CartResponse {
    pub fn new(items: &[CartItem]) -> Self {
        Self { items: items.to_vec(), count: items.len() }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order: Order,
    pub bookings: Vec<Booking>,
}
