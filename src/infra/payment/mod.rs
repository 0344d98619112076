pub mod stripe_gateway;
pub mod stripe_webhook;
