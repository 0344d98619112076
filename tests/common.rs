#![allow(dead_code)]

use camp_bookings::{
    api::router::create_router,
    config::Config,
    domain::models::location::{Location, NewLocationParams},
    domain::models::order::{NewOrderItem, Order, OrderStatus, PaymentIntent, PaymentIntentStatus},
    domain::models::product::Product,
    domain::models::student::Student,
    domain::models::template::{NewTemplateParams, RecurringTemplate},
    domain::ports::{CreatePaymentIntent, PaymentGateway},
    error::AppError,
    infra::factory::{run_sqlite_migrations, sqlite_repositories},
    infra::payment::stripe_webhook::sign,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const SYDNEY: &str = "Australia/Sydney";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// In-memory stand-in for the card processor.
#[derive(Default)]
pub struct MockPaymentGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    by_order: Mutex<HashMap<String, String>>,
    unavailable_calls: AtomicU32,
    pub create_calls: AtomicU32,
    pub retrieve_calls: AtomicU32,
}

impl MockPaymentGateway {
    pub fn set_status(&self, intent_id: &str, status: PaymentIntentStatus) {
        if let Some(intent) = self.intents.lock().unwrap().get_mut(intent_id) {
            intent.status = status;
        }
    }

    pub fn intent(&self, intent_id: &str) -> PaymentIntent {
        self.intents.lock().unwrap().get(intent_id).cloned().expect("unknown intent")
    }

    /// The next `n` gateway calls time out.
    pub fn fail_next(&self, n: u32) {
        self.unavailable_calls.store(n, Ordering::SeqCst);
    }

    fn outage(&self) -> Result<(), AppError> {
        let remaining = self.unavailable_calls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.unavailable_calls.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::PaymentGatewayUnavailable("operation timed out".into()));
        }
        Ok(())
    }

    pub fn insert(&self, intent: PaymentIntent) {
        self.intents.lock().unwrap().insert(intent.id.clone(), intent);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;

        if let Some(id) = self.by_order.lock().unwrap().get(&request.order_id) {
            return Ok(self.intent(id));
        }
        let intent = PaymentIntent {
            id: format!("pi_{}", Uuid::new_v4().simple()),
            status: PaymentIntentStatus::RequiresPaymentMethod,
            amount: request.amount,
            currency: request.currency.clone(),
            client_secret: Some(format!("secret_{}", request.order_id)),
        };
        self.by_order.lock().unwrap().insert(request.order_id.clone(), intent.id.clone());
        self.insert(intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;
        self.intents.lock().unwrap().get(id).cloned()
            .ok_or_else(|| AppError::PaymentGateway(format!("No such payment_intent: {}", id)))
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
    pub content_type: Option<String>,
    pub set_cookie: Option<String>,
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub gateway: Arc<MockPaymentGateway>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        run_sqlite_migrations(&pool).await.expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url,
            port: 0,
            default_timezone: SYDNEY.parse().unwrap(),
            currency: "aud".to_string(),
            stripe_api_url: "http://localhost".to_string(),
            stripe_secret_key: "sk_test".to_string(),
            stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
            payment_timeout: Duration::from_secs(1),
            payment_max_retries: 2,
            reconcile_lease: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(60),
        };

        let gateway = Arc::new(MockPaymentGateway::default());
        let state = Arc::new(AppState::new(config, sqlite_repositories(pool.clone()), gateway.clone()));
        let router = create_router(state.clone());

        Self { router, pool, db_filename, state, gateway }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE)
            .map(|h| h.to_str().unwrap().to_string());
        let set_cookie = response.headers().get_all(header::SET_COOKIE)
            .iter()
            .map(|h| h.to_str().unwrap().to_string())
            .find(|c| c.starts_with("cart_session="))
            .map(|c| c.split(';').next().unwrap().to_string());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body, text, content_type, set_cookie }
    }

    /// Posts a correctly signed payment webhook.
    pub async fn send_webhook(&self, event_type: &str, intent: &PaymentIntent) -> TestResponse {
        let payload = serde_json::json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": event_type,
            "data": { "object": intent },
        })
        .to_string();
        let ts = Utc::now().timestamp();
        let signature = format!("t={},v1={}", ts, sign(WEBHOOK_SECRET, ts, payload.as_bytes()).unwrap());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/stripe")
            .header(header::CONTENT_TYPE, "application/json")
            .header("Stripe-Signature", signature)
            .body(Body::from(payload))
            .unwrap();
        self.send(request).await
    }

    pub async fn seed_location(&self, capacity: i32, allowed_dates: Option<Vec<NaiveDate>>) -> Location {
        let location = Location::new(NewLocationParams {
            name: "Chatswood Campus".into(),
            address: "1 Victoria Ave".into(),
            capacity,
            timezone: SYDNEY.into(),
            allowed_camp_types: None,
            allowed_dates,
        });
        self.state.location_repo.create(&location).await.unwrap()
    }

    pub async fn seed_product(&self, price: i64) -> Product {
        let product = Product::new("Robotics Day Camp".into(), "ROBOTICS".into(), price);
        self.state.product_repo.create(&product).await.unwrap()
    }

    pub async fn seed_student(&self, name: &str) -> Student {
        self.state.student_repo.create(&Student::new(name.into())).await.unwrap()
    }

    /// A template running 09:00-15:00 local every day of the window.
    pub async fn seed_template(&self, product: &Product, location: &Location, first: NaiveDate, last: NaiveDate) -> RecurringTemplate {
        let template = RecurringTemplate::new(NewTemplateParams {
            name: format!("Template {}", Uuid::new_v4().simple()),
            title: "Robotics Camp".into(),
            camp_type: "ROBOTICS".into(),
            product_id: product.id.clone(),
            location_id: location.id.clone(),
            start_date: first,
            end_date: last,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            weekday_mask: None,
        });
        self.state.template_repo.create(&template).await.unwrap()
    }

    /// An order that the gateway has already charged.
    pub async fn seed_paid_order(&self, items: Vec<NewOrderItem>) -> Order {
        let order_id = Order::new_id();
        let total: i64 = items.iter().map(|i| i.price).sum();
        let intent_id = format!("pi_{}", Uuid::new_v4().simple());
        self.gateway.insert(PaymentIntent {
            id: intent_id.clone(),
            status: PaymentIntentStatus::Succeeded,
            amount: total,
            currency: "aud".into(),
            client_secret: None,
        });

        let order = Order::new(order_id, "parent@example.com".into(), "Sam Parent".into(), "aud".into(), intent_id, items);
        let order = self.state.order_repo.create(&order).await.unwrap();
        self.state.order_repo
            .transition_status(&order.id, OrderStatus::Paid, Utc::now())
            .await
            .unwrap()
            .expect("order should move to PAID")
    }
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn item(product: &Product, student: &Student, location: &Location, booking_date: DateTime<Utc>) -> NewOrderItem {
    NewOrderItem {
        product_id: product.id.clone(),
        student_id: student.id.clone(),
        location_id: location.id.clone(),
        booking_date,
        price: product.price,
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
