mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use camp_bookings::domain::models::order::PaymentIntentStatus;
use common::{ymd, TestApp, SYDNEY};
use serde_json::json;

struct Checkout {
    cookie: String,
    order_id: String,
    intent_id: String,
}

/// Fills a cart with one day of camp and checks it out.
async fn checkout_one(app: &TestApp) -> Checkout {
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;
    let template = app.seed_template(&product, &location, ymd(2026, 3, 1), ymd(2026, 3, 7)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    let add = app.request("POST", "/api/v1/cart", Some(json!({
        "product_id": product.id,
        "student_id": student.id,
        "location_id": location.id,
        "booking_date": "2026-03-02",
    })), None).await;
    assert_eq!(add.status, StatusCode::CREATED, "{}", add.text);
    let cookie = add.set_cookie.expect("cart session cookie");

    let res = app.request("POST", "/api/v1/checkout", Some(json!({
        "customer_email": "parent@example.com",
        "customer_name": "Sam Parent",
    })), Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text);

    let order_id = res.body["order_id"].as_str().unwrap().to_string();
    let order = app.state.order_repo.find_by_id(&order_id).await.unwrap().unwrap();
    Checkout { cookie, order_id, intent_id: order.payment_intent_id }
}

#[tokio::test]
async fn test_cart_session_flow() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;

    let empty = app.request("GET", "/api/v1/cart", None, None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["count"], 0);
    let cookie = empty.set_cookie.expect("cart session cookie");

    let line = json!({
        "product_id": product.id,
        "student_id": student.id,
        "location_id": location.id,
        "booking_date": "2026-03-02T01:00:00Z",
    });
    let add = app.request("POST", "/api/v1/cart", Some(line.clone()), Some(&cookie)).await;
    assert_eq!(add.status, StatusCode::CREATED);
    // The session is kept, not reissued.
    assert!(add.set_cookie.is_none());

    let again = app.request("POST", "/api/v1/cart", Some(line), Some(&cookie)).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["count"], 1);

    let other_session = app.request("GET", "/api/v1/cart", None, None).await;
    assert_eq!(other_session.body["count"], 0);

    let missing = app.request("DELETE", "/api/v1/cart/items/5", None, Some(&cookie)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let removed = app.request("DELETE", "/api/v1/cart/items/0", None, Some(&cookie)).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["count"], 0);

    let unknown_student = app.request("POST", "/api/v1/cart", Some(json!({
        "product_id": product.id,
        "student_id": "nobody",
        "location_id": location.id,
        "booking_date": "2026-03-02",
    })), Some(&cookie)).await;
    assert_eq!(unknown_student.status, StatusCode::NOT_FOUND);

    let cleared = app.request("DELETE", "/api/v1/cart", None, Some(&cookie)).await;
    assert_eq!(cleared.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_checkout_prices_from_catalog_and_empties_cart() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;

    let order = app.request("GET", &format!("/api/v1/orders/{}", checkout.order_id), None, None).await;
    assert_eq!(order.status, StatusCode::OK);
    assert_eq!(order.body["order"]["status"], "PENDING");
    assert_eq!(order.body["order"]["total_amount"], 12000);
    assert_eq!(order.body["order"]["items"].as_array().unwrap().len(), 1);
    assert!(order.body["bookings"].as_array().unwrap().is_empty());

    let intent = app.gateway.intent(&checkout.intent_id);
    assert_eq!(intent.amount, 12000);
    assert_eq!(intent.client_secret.as_deref(), Some(format!("secret_{}", checkout.order_id).as_str()));

    let cart = app.request("GET", "/api/v1/cart", None, Some(&checkout.cookie)).await;
    assert_eq!(cart.body["count"], 0);

    let empty = app.request("POST", "/api/v1/checkout", Some(json!({
        "customer_email": "parent@example.com",
        "customer_name": "Sam Parent",
    })), Some(&checkout.cookie)).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_rejects_closed_day() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, Some(vec![ymd(2026, 3, 3)])).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;

    let add = app.request("POST", "/api/v1/cart", Some(json!({
        "product_id": product.id,
        "student_id": student.id,
        "location_id": location.id,
        "booking_date": "2026-03-02",
    })), None).await;
    let cookie = add.set_cookie.unwrap();

    let res = app.request("POST", "/api/v1/checkout", Some(json!({
        "customer_email": "parent@example.com",
        "customer_name": "Sam Parent",
    })), Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    // The cart survives a failed checkout.
    let cart = app.request("GET", "/api/v1/cart", None, Some(&cookie)).await;
    assert_eq!(cart.body["count"], 1);
}

#[tokio::test]
async fn test_checkout_accepts_product_scheduled_by_camp_template() {
    let app = TestApp::new().await;
    let location = app.request("POST", "/api/v1/locations", Some(json!({
        "name": "Chatswood Campus",
        "address": "1 Victoria Ave",
        "capacity": 20,
        "timezone": SYDNEY,
        "allowed_camp_types": ["ROBOTICS"],
    })), None).await;
    assert_eq!(location.status, StatusCode::CREATED, "{}", location.text);
    let location_id = location.body["id"].as_str().unwrap().to_string();

    // The catalog type differs from the camp type the location runs.
    let product = app.request("POST", "/api/v1/products", Some(json!({
        "name": "Robotics Day Camp",
        "product_type": "CAMP",
        "price": 12000,
    })), None).await;
    assert_eq!(product.status, StatusCode::CREATED);
    let product_id = product.body["id"].as_str().unwrap().to_string();

    let template = app.request("POST", "/api/v1/templates", Some(json!({
        "name": "Autumn 2026",
        "title": "Robotics Camp",
        "camp_type": "ROBOTICS",
        "product_id": product_id,
        "location_id": location_id,
        "start_date": "2026-03-02",
        "end_date": "2026-03-02",
        "start_time": "09:00",
        "end_time": "15:00",
    })), None).await;
    assert_eq!(template.status, StatusCode::CREATED, "{}", template.text);
    let template_id = template.body["id"].as_str().unwrap();
    let expanded = app.request("POST", &format!("/api/v1/templates/{}/expand", template_id), None, None).await;
    assert_eq!(expanded.body["created"].as_array().unwrap().len(), 1);

    let student = app.seed_student("Alice").await;
    let add = app.request("POST", "/api/v1/cart", Some(json!({
        "product_id": product_id,
        "student_id": student.id,
        "location_id": location_id,
        "booking_date": "2026-03-02",
    })), None).await;
    assert_eq!(add.status, StatusCode::CREATED, "{}", add.text);
    let cookie = add.set_cookie.unwrap();

    let res = app.request("POST", "/api/v1/checkout", Some(json!({
        "customer_email": "parent@example.com",
        "customer_name": "Sam Parent",
    })), Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text);
    assert_eq!(res.body["total_amount"], 12000);
}

#[tokio::test]
async fn test_checkout_retries_gateway_outage() {
    let app = TestApp::new().await;
    app.gateway.fail_next(1);
    let checkout = checkout_one(&app).await;

    assert_eq!(app.gateway.create_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(app.state.order_repo.find_by_id(&checkout.order_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_succeeded_webhook_pays_and_books_once() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;

    app.gateway.set_status(&checkout.intent_id, PaymentIntentStatus::Succeeded);
    let intent = app.gateway.intent(&checkout.intent_id);

    let res = app.send_webhook("payment_intent.succeeded", &intent).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.body["handled"], true);
    assert_eq!(res.body["outcome"]["status"], "PAID");
    assert_eq!(res.body["outcome"]["reconciliation"]["items"][0]["status"], "LINKED");

    let replay = app.send_webhook("payment_intent.succeeded", &intent).await;
    assert_eq!(replay.status, StatusCode::OK);

    let order = app.request("GET", &format!("/api/v1/orders/{}", checkout.order_id), None, None).await;
    assert_eq!(order.body["order"]["status"], "PAID");
    assert!(!order.body["order"]["paid_at"].is_null());
    assert_eq!(order.body["bookings"].as_array().unwrap().len(), 1);
    assert!(order.body["bookings"][0]["event_id"].is_string());
}

#[tokio::test]
async fn test_webhook_signature_is_required() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;
    let payload = json!({
        "id": "evt_forged",
        "type": "payment_intent.succeeded",
        "data": { "object": app.gateway.intent(&checkout.intent_id) },
    })
    .to_string();

    for signature in [None, Some(format!("t={},v1={}", chrono::Utc::now().timestamp(), "00".repeat(32)))] {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/stripe")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(sig) = signature {
            builder = builder.header("Stripe-Signature", sig);
        }
        let res = app.send(builder.body(Body::from(payload.clone())).unwrap()).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    let order = app.state.order_repo.find_by_id(&checkout.order_id).await.unwrap().unwrap();
    assert_eq!(order.status.as_str(), "PENDING");
}

#[tokio::test]
async fn test_webhook_for_unknown_intent_is_acknowledged() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;
    let mut intent = app.gateway.intent(&checkout.intent_id);
    intent.id = "pi_someone_else".into();
    intent.status = PaymentIntentStatus::Succeeded;

    let res = app.send_webhook("payment_intent.succeeded", &intent).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["handled"], false);

    let other = app.send_webhook("customer.created", &intent).await;
    assert_eq!(other.status, StatusCode::OK);
    assert_eq!(other.body["handled"], false);
}

#[tokio::test]
async fn test_amount_mismatch_leaves_order_unpaid() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;
    let mut intent = app.gateway.intent(&checkout.intent_id);
    intent.status = PaymentIntentStatus::Succeeded;
    intent.amount = 100;

    let res = app.send_webhook("payment_intent.succeeded", &intent).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let order = app.state.order_repo.find_by_id(&checkout.order_id).await.unwrap().unwrap();
    assert_eq!(order.status.as_str(), "PENDING");
    assert!(app.state.booking_repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_payment_can_still_be_paid() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;

    app.gateway.set_status(&checkout.intent_id, PaymentIntentStatus::RequiresPaymentMethod);
    let declined = app.send_webhook("payment_intent.payment_failed", &app.gateway.intent(&checkout.intent_id)).await;
    assert_eq!(declined.body["outcome"]["status"], "FAILED");
    assert!(app.state.booking_repo.list().await.unwrap().is_empty());

    app.gateway.set_status(&checkout.intent_id, PaymentIntentStatus::Succeeded);
    let paid = app.send_webhook("payment_intent.succeeded", &app.gateway.intent(&checkout.intent_id)).await;
    assert_eq!(paid.body["outcome"]["status"], "PAID");

    // A late failure notice cannot undo the payment.
    let late = app.send_webhook("payment_intent.payment_failed", &app.gateway.intent(&checkout.intent_id)).await;
    assert_eq!(late.body["outcome"]["status"], "PAID");
    assert_eq!(app.state.booking_repo.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_poll_settles_order() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;
    let uri = format!("/api/v1/orders/{}/status", checkout.order_id);

    let pending = app.request("GET", &uri, None, None).await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["order"]["status"], "PENDING");
    assert_eq!(pending.body["payment_lookup"], "CHECKED");
    assert!(pending.body["reconciliation"].is_null());

    app.gateway.set_status(&checkout.intent_id, PaymentIntentStatus::Succeeded);
    let paid = app.request("GET", &uri, None, None).await;
    assert_eq!(paid.body["order"]["status"], "PAID");
    assert_eq!(paid.body["reconciliation"]["items"][0]["status"], "LINKED");

    // Settled orders are answered locally.
    let calls = app.gateway.retrieve_calls.load(std::sync::atomic::Ordering::SeqCst);
    let cached = app.request("GET", &uri, None, None).await;
    assert_eq!(cached.body["payment_lookup"], "SKIPPED");
    assert_eq!(app.gateway.retrieve_calls.load(std::sync::atomic::Ordering::SeqCst), calls);
    assert_eq!(app.state.booking_repo.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_poll_survives_gateway_outage() {
    let app = TestApp::new().await;
    let checkout = checkout_one(&app).await;
    app.gateway.set_status(&checkout.intent_id, PaymentIntentStatus::Succeeded);

    // One more failure than the retry budget.
    app.gateway.fail_next(3);
    let res = app.request("GET", &format!("/api/v1/orders/{}/status", checkout.order_id), None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["payment_lookup"], "UNAVAILABLE");
    assert_eq!(res.body["order"]["status"], "PENDING");

    let res = app.request("GET", &format!("/api/v1/orders/{}/status", checkout.order_id), None, None).await;
    assert_eq!(res.body["order"]["status"], "PAID");
}
