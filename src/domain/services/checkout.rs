use std::sync::Arc;
use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::domain::models::cart::CartItem;
use crate::domain::models::order::{NewOrderItem, Order};
use crate::domain::ports::{
    CartRepository, CreatePaymentIntent, LocationRepository, OrderRepository, PaymentGateway,
    ProductRepository, StudentRepository,
};
use crate::domain::services::payment::{with_retry, RetryPolicy};
use crate::domain::services::timezone::{local_day, resolve_timezone};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Customer {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResult {
    pub order_id: String,
    pub client_secret: Option<String>,
    pub total_amount: i64,
    pub currency: String,
}

pub struct CheckoutService {
    cart_repo: Arc<dyn CartRepository>,
    product_repo: Arc<dyn ProductRepository>,
    location_repo: Arc<dyn LocationRepository>,
    student_repo: Arc<dyn StudentRepository>,
    order_repo: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    retry: RetryPolicy,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cart_repo: Arc<dyn CartRepository>,
        product_repo: Arc<dyn ProductRepository>,
        location_repo: Arc<dyn LocationRepository>,
        student_repo: Arc<dyn StudentRepository>,
        order_repo: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
        retry: RetryPolicy,
    ) -> Self {
        Self { cart_repo, product_repo, location_repo, student_repo, order_repo, gateway, currency, retry }
    }

    /// Turns the session's cart into a PENDING order with a payment intent.
    /// The cart is only cleared once the order row exists.
    pub async fn checkout(&self, session_id: &str, customer: Customer) -> Result<CheckoutResult, AppError> {
        let span = info_span!("checkout", session = %session_id);

        async move {
            validate_customer(&customer)?;

            let cart = self.cart_repo.load(session_id).await?
                .filter(|c| !c.is_empty())
                .ok_or_else(|| AppError::Validation("Cart is empty".into()))?;

            let mut items = Vec::with_capacity(cart.items().len());
            for item in cart.items() {
                items.push(self.price_item(item).await?);
            }

            let order_id = Order::new_id();
            let request = CreatePaymentIntent {
                order_id: order_id.clone(),
                amount: items.iter().map(|i| i.price).sum(),
                currency: self.currency.clone(),
                receipt_email: customer.email.clone(),
            };

            // Retrying is safe: the gateway dedupes on the order id.
            let gateway = self.gateway.clone();
            let intent = with_retry(&self.retry, "Payment intent creation", || {
                let gateway = gateway.clone();
                let request = request.clone();
                async move { gateway.create_payment_intent(&request).await }
            })
            .await?;

            let order = Order::new(
                order_id,
                customer.email,
                customer.name,
                self.currency.clone(),
                intent.id.clone(),
                items,
            );
            let order = self.order_repo.create(&order).await?;
            self.cart_repo.delete(session_id).await?;

            info!(
                order_id = %order.id,
                items = order.items.len(),
                total = order.total_amount,
                "Order created"
            );

            Ok(CheckoutResult {
                order_id: order.id,
                client_secret: intent.client_secret,
                total_amount: order.total_amount,
                currency: order.currency,
            })
        }
            .instrument(span)
            .await
    }

    /// Checks a cart line against the catalog and prices it from the product.
    async fn price_item(&self, item: &CartItem) -> Result<NewOrderItem, AppError> {
        let product = self.product_repo.find_by_id(&item.product_id).await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::Validation(format!("Product {} is not available", item.product_id)))?;

        let location = self.location_repo.find_by_id(&item.location_id).await?
            .ok_or_else(|| AppError::Validation(format!("Location {} not found", item.location_id)))?;
        // Camp types belong to templates and are checked when events are expanded.
        if !location.is_active {
            return Err(AppError::LocationUnavailable(format!("{} is not taking bookings", location.name)));
        }

        let tz = resolve_timezone(&location.timezone)?;
        let day = local_day(item.booking_date, &tz);
        if !location.is_open_on(day) {
            return Err(AppError::LocationUnavailable(format!("{} is closed on {}", location.name, day)));
        }

        if self.student_repo.find_by_id(&item.student_id).await?.is_none() {
            return Err(AppError::Validation(format!("Student {} not found", item.student_id)));
        }

        Ok(NewOrderItem {
            product_id: product.id,
            student_id: item.student_id.clone(),
            location_id: location.id,
            booking_date: item.booking_date,
            price: product.price,
        })
    }
}

fn validate_customer(customer: &Customer) -> Result<(), AppError> {
    let email = customer.email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::Validation("A valid customer email is required".into()));
    }
    if customer.name.trim().is_empty() {
        return Err(AppError::Validation("Customer name is required".into()));
    }
    Ok(())
}
