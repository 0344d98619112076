pub mod admin;
pub mod calendar;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod location;
pub mod order;
pub mod template;
pub mod webhook;
