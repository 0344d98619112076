use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, put, delete},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{admin, calendar, cart, catalog, checkout, health, location, order, template, webhook};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Catalog
        .route("/api/v1/locations", post(location::create_location).get(location::list_locations))
        .route("/api/v1/locations/{id}", put(location::update_location).delete(location::delete_location))
        .route("/api/v1/products", post(catalog::create_product).get(catalog::list_products))
        .route("/api/v1/students", post(catalog::create_student).get(catalog::list_students))

        // Recurring templates
        .route("/api/v1/templates", post(template::create_template).get(template::list_templates))
        .route("/api/v1/templates/{id}", put(template::update_template))
        .route("/api/v1/templates/{id}/expand", post(template::expand_template))

        // Calendar read API
        .route("/api/v1/calendar", get(calendar::list_events))
        .route("/api/v1/calendar.ics", get(calendar::export_ics))

        // Cart & checkout
        .route("/api/v1/cart", get(cart::get_cart).post(cart::add_item).delete(cart::clear_cart))
        .route("/api/v1/cart/items/{index}", delete(cart::remove_item))
        .route("/api/v1/checkout", post(checkout::checkout))

        // Orders & payment
        .route("/api/v1/orders/{id}", get(order::get_order))
        .route("/api/v1/orders/{id}/status", get(order::get_order_status))
        .route("/api/v1/webhooks/stripe", post(webhook::stripe_webhook))

        // Operator remediation
        .route("/api/v1/admin/bookings/unlinked", get(admin::list_unlinked_bookings))
        .route("/api/v1/admin/bookings/review", get(admin::list_review_bookings))
        .route("/api/v1/admin/bookings/backfill", post(admin::backfill_bookings))
        .route("/api/v1/admin/bookings/{id}/cancel", post(admin::cancel_booking))
        .route("/api/v1/admin/orders/{id}/reconcile", post(admin::reconcile_order))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        cart_session = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}