mod common;

use axum::http::StatusCode;
use camp_bookings::background::{sweep_batch, sweep_once};
use camp_bookings::domain::models::booking::BookingStatus;
use camp_bookings::domain::models::order::Order;
use camp_bookings::domain::models::reconciliation::{ItemStatus, ReconcileIssue};
use camp_bookings::error::AppError;
use common::{item, utc, ymd, TestApp};

#[tokio::test]
async fn test_reconcile_creates_one_linked_booking_per_item() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let alice = app.seed_student("Alice").await;
    let bob = app.seed_student("Bob").await;
    let template = app.seed_template(&product, &location, ymd(2026, 3, 1), ymd(2026, 3, 7)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    // 23:30 UTC on the 2nd is the morning of the 3rd in Sydney.
    let order = app.seed_paid_order(vec![
        item(&product, &alice, &location, utc(2026, 3, 2, 23, 30)),
        item(&product, &bob, &location, utc(2026, 3, 3, 2, 0)),
    ]).await;

    let first = app.state.reconciler.reconcile(&order.id).await.unwrap();
    assert!(first.is_complete());
    assert!(first.items.iter().all(|i| i.status == ItemStatus::Linked));

    let second = app.state.reconciler.reconcile(&order.id).await.unwrap();
    assert_eq!(first.booking_ids(), second.booking_ids());

    let bookings = app.state.booking_repo.list_by_order(&order.id).await.unwrap();
    assert_eq!(bookings.len(), 2);
    for booking in &bookings {
        assert_eq!(booking.local_day, ymd(2026, 3, 3));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        // The booking takes the event's 09:00-15:00 AEDT window.
        assert_eq!(booking.start_time, utc(2026, 3, 2, 22, 0));
        assert_eq!(booking.end_time, utc(2026, 3, 3, 4, 0));
    }
    // Both items sit on the same event.
    assert_eq!(bookings[0].event_id, bookings[1].event_id);

    let stored = app.state.order_repo.find_by_id(&order.id).await.unwrap().unwrap();
    assert!(stored.reconciled_at.is_some());
}

#[tokio::test]
async fn test_missing_event_is_backfilled_later() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;

    let order = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;

    let report = app.state.reconciler.reconcile(&order.id).await.unwrap();
    assert!(!report.is_complete());
    let line = &report.items[0];
    assert_eq!(line.status, ItemStatus::Unlinked);
    assert!(line.booking_id.is_some());
    assert_eq!(line.issue, Some(ReconcileIssue::EventNotFound { day: "2026-03-02".into() }));

    // The paid booking exists even without a calendar event.
    let booking = app.state.booking_repo.find_by_id(line.booking_id.as_ref().unwrap()).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(booking.event_id.is_none());

    let unlinked = app.request("GET", "/api/v1/admin/bookings/unlinked", None, None).await;
    assert_eq!(unlinked.status, StatusCode::OK);
    assert_eq!(unlinked.body.as_array().unwrap().len(), 1);

    let template = app.seed_template(&product, &location, ymd(2026, 3, 1), ymd(2026, 3, 7)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    let backfill = app.request("POST", "/api/v1/admin/bookings/backfill", None, None).await;
    assert_eq!(backfill.status, StatusCode::OK);
    assert_eq!(backfill.body["examined"], 1);
    assert_eq!(backfill.body["linked"], 1);

    let again = app.state.reconciler.reconcile(&order.id).await.unwrap();
    assert!(again.is_complete());
    assert_eq!(again.booking_ids(), report.booking_ids());
    assert_eq!(app.state.booking_repo.list_by_order(&order.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ambiguous_events_pick_first_and_flag_review() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;

    let morning = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    let duplicate = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    app.state.event_generator.generate(&morning.id).await.unwrap();
    app.state.event_generator.generate(&duplicate.id).await.unwrap();

    let order = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;
    let report = app.state.reconciler.reconcile(&order.id).await.unwrap();

    let line = &report.items[0];
    assert_eq!(line.status, ItemStatus::NeedsReview);
    let Some(ReconcileIssue::AmbiguousEvent { chosen, candidates }) = &line.issue else {
        panic!("expected an ambiguous event issue, got {:?}", line.issue);
    };
    assert_eq!(candidates.len(), 2);
    let mut sorted = candidates.clone();
    sorted.sort();
    assert_eq!(chosen, &sorted[0]);
    assert_eq!(line.event_id.as_ref(), Some(chosen));

    let review = app.request("GET", "/api/v1/admin/bookings/review", None, None).await;
    assert_eq!(review.body.as_array().unwrap().len(), 1);
    assert_eq!(review.body[0]["id"], line.booking_id.clone().unwrap());

    // Re-running keeps the chosen link and the review flag.
    let again = app.state.reconciler.reconcile(&order.id).await.unwrap();
    assert_eq!(again.items[0].status, ItemStatus::NeedsReview);
    assert_eq!(again.items[0].event_id, line.event_id);
}

#[tokio::test]
async fn test_full_event_leaves_booking_for_review() {
    let app = TestApp::new().await;
    let location = app.seed_location(1, None).await;
    let product = app.seed_product(12000).await;
    let alice = app.seed_student("Alice").await;
    let bob = app.seed_student("Bob").await;
    let template = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    let generated = app.state.event_generator.generate(&template.id).await.unwrap();
    let event_id = generated.created[0].id.clone();

    let first = app.seed_paid_order(vec![item(&product, &alice, &location, utc(2026, 3, 2, 0, 0))]).await;
    let second = app.seed_paid_order(vec![item(&product, &bob, &location, utc(2026, 3, 2, 0, 0))]).await;

    let report = app.state.reconciler.reconcile(&first.id).await.unwrap();
    assert_eq!(report.items[0].status, ItemStatus::Linked);

    let report = app.state.reconciler.reconcile(&second.id).await.unwrap();
    let line = &report.items[0];
    assert_eq!(line.status, ItemStatus::NeedsReview);
    assert!(line.event_id.is_none());
    assert_eq!(line.issue, Some(ReconcileIssue::EventAtCapacity { event_id: event_id.clone() }));

    let booking = app.state.booking_repo.find_by_id(line.booking_id.as_ref().unwrap()).await.unwrap().unwrap();
    assert!(booking.needs_review);
    assert_eq!(booking.status, BookingStatus::Confirmed);

    // Flagged bookings wait for an operator instead of the automatic backfill.
    let summary = app.state.reconciler.backfill_unlinked(100).await.unwrap();
    assert_eq!(summary.examined, 0);

    // Cancelling the first booking frees the seat for an operator re-run.
    let alice_booking = report_booking(&app, &first).await;
    let cancel = app.request("POST", &format!("/api/v1/admin/bookings/{}/cancel", alice_booking), None, None).await;
    assert_eq!(cancel.status, StatusCode::OK);
    assert_eq!(cancel.body["status"], "CANCELLED");

    let rerun = app.request("POST", &format!("/api/v1/admin/orders/{}/reconcile", second.id), None, None).await;
    assert_eq!(rerun.status, StatusCode::OK, "{}", rerun.text);
    let booking = app.state.booking_repo.find_by_id(&booking.id).await.unwrap().unwrap();
    assert_eq!(booking.event_id.as_deref(), Some(event_id.as_str()));
}

#[tokio::test]
async fn test_cancelled_booking_is_not_recreated() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;
    let template = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    let order = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;
    let report = app.state.reconciler.reconcile(&order.id).await.unwrap();
    let booking_id = report.items[0].booking_id.clone().unwrap();

    let cancel = app.request("POST", &format!("/api/v1/admin/bookings/{}/cancel", booking_id), None, None).await;
    assert_eq!(cancel.status, StatusCode::OK);

    // A later status poll runs reconciliation again.
    let poll = app.request("GET", &format!("/api/v1/orders/{}/status", order.id), None, None).await;
    assert_eq!(poll.status, StatusCode::OK);
    assert_eq!(poll.body["reconciliation"]["items"][0]["status"], "CANCELLED");
    assert_eq!(poll.body["reconciliation"]["items"][0]["booking_id"], booking_id);

    let again = app.state.reconciler.reconcile(&order.id).await.unwrap();
    assert_eq!(again.items[0].status, ItemStatus::Cancelled);
    assert!(again.is_complete());
    sweep_once(&app.state).await.unwrap();

    let bookings = app.state.booking_repo.list_by_order(&order.id).await.unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].status, BookingStatus::Cancelled);
    assert!(app.state.booking_repo
        .find_active_by_key(&student.id, &product.id, ymd(2026, 3, 2), &location.id)
        .await
        .unwrap()
        .is_none());
}

async fn report_booking(app: &TestApp, order: &Order) -> String {
    app.state.booking_repo.list_by_order(&order.id).await.unwrap()[0].id.clone()
}

#[tokio::test]
async fn test_same_item_in_two_orders_is_flagged_not_duplicated() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;
    let template = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    let first = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;
    let second = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 3, 0))]).await;

    let a = app.state.reconciler.reconcile(&first.id).await.unwrap();
    let b = app.state.reconciler.reconcile(&second.id).await.unwrap();
    assert_eq!(a.booking_ids(), b.booking_ids());
    assert_eq!(b.items[0].status, ItemStatus::NeedsReview);

    let all = app.state.booking_repo.list().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].needs_review);
    assert!(all[0].review_reason.as_deref().unwrap().contains(&second.id));
}

#[tokio::test]
async fn test_unpaid_order_is_not_reconciled() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;

    let order = Order::new(
        Order::new_id(),
        "parent@example.com".into(),
        "Sam Parent".into(),
        "aud".into(),
        "pi_unpaid".into(),
        vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))],
    );
    let order = app.state.order_repo.create(&order).await.unwrap();

    let err = app.state.reconciler.reconcile(&order.id).await.unwrap_err();
    assert!(matches!(err, AppError::PaymentNotConfirmed(_)));

    let res = app.request("POST", &format!("/api/v1/admin/orders/{}/reconcile", order.id), None, None).await;
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert_eq!(res.body["order_id"], order.id);

    assert!(app.state.booking_repo.list().await.unwrap().is_empty());

    let missing = app.request("POST", "/api/v1/admin/orders/nope/reconcile", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sweeper_finishes_paid_orders() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;
    let template = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    let order = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;

    let summary = sweep_once(&app.state).await.unwrap();
    assert_eq!(summary.reconciled, 1);

    let stored = app.state.order_repo.find_by_id(&order.id).await.unwrap().unwrap();
    assert!(stored.reconciled_at.is_some());
    assert_eq!(app.state.booking_repo.list_by_order(&order.id).await.unwrap().len(), 1);

    let idle = sweep_once(&app.state).await.unwrap();
    assert_eq!(idle.reconciled, 0);
}

#[tokio::test]
async fn test_sweeper_reaches_orders_behind_stuck_ones() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let template = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    // No event ever exists on the 10th, so these orders never finish.
    for name in ["Alice", "Bob", "Cleo"] {
        let student = app.seed_student(name).await;
        app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 10, 0, 0))]).await;
    }
    let student = app.seed_student("Dana").await;
    let linkable = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;

    let first = sweep_batch(&app.state, 2).await.unwrap();
    assert_eq!(first.deferred, 2);
    assert_eq!(first.reconciled, 0);

    let second = sweep_batch(&app.state, 2).await.unwrap();
    assert_eq!(second.reconciled, 1);
    let stored = app.state.order_repo.find_by_id(&linkable.id).await.unwrap().unwrap();
    assert!(stored.reconciled_at.is_some());
}

#[tokio::test]
async fn test_backfill_rotates_past_bookings_that_stay_unlinked() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;

    for name in ["Alice", "Bob"] {
        let student = app.seed_student(name).await;
        let order = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 10, 0, 0))]).await;
        app.state.reconciler.reconcile(&order.id).await.unwrap();
    }
    let student = app.seed_student("Cleo").await;
    let order = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;
    let report = app.state.reconciler.reconcile(&order.id).await.unwrap();
    let newest = report.items[0].booking_id.clone().unwrap();

    let template = app.seed_template(&product, &location, ymd(2026, 3, 2), ymd(2026, 3, 2)).await;
    app.state.event_generator.generate(&template.id).await.unwrap();

    let first = app.state.reconciler.backfill_unlinked(2).await.unwrap();
    assert_eq!(first.examined, 2);
    assert_eq!(first.linked, 0);

    let second = app.state.reconciler.backfill_unlinked(2).await.unwrap();
    assert_eq!(second.linked, 1);
    let booking = app.state.booking_repo.find_by_id(&newest).await.unwrap().unwrap();
    assert!(booking.event_id.is_some());
}

#[tokio::test]
async fn test_referenced_location_cannot_be_deleted() {
    let app = TestApp::new().await;
    let location = app.seed_location(20, None).await;
    let product = app.seed_product(12000).await;
    let student = app.seed_student("Alice").await;
    let order = app.seed_paid_order(vec![item(&product, &student, &location, utc(2026, 3, 2, 0, 0))]).await;
    app.state.reconciler.reconcile(&order.id).await.unwrap();

    let res = app.request("DELETE", &format!("/api/v1/locations/{}", location.id), None, None).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let unused = app.seed_location(5, None).await;
    let res = app.request("DELETE", &format!("/api/v1/locations/{}", unused.id), None, None).await;
    assert_eq!(res.status, StatusCode::OK);
}
