use std::sync::Arc;
use crate::config::Config;
use crate::domain::ports::{
    BookingRepository, CartRepository, EventRepository, LocationRepository, OrderRepository,
    PaymentGateway, ProductRepository, StudentRepository, TemplateRepository,
};
use crate::domain::services::calendar::CalendarService;
use crate::domain::services::checkout::CheckoutService;
use crate::domain::services::order_lock::{LeaseSettings, OrderLocks};
use crate::domain::services::payment::{PaymentService, RetryPolicy};
use crate::domain::services::reconciler::BookingReconciler;
use crate::domain::services::recurrence::EventGenerator;

/// One storage backend's repositories.
#[derive(Clone)]
pub struct Repositories {
    pub location_repo: Arc<dyn LocationRepository>,
    pub product_repo: Arc<dyn ProductRepository>,
    pub student_repo: Arc<dyn StudentRepository>,
    pub template_repo: Arc<dyn TemplateRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub order_repo: Arc<dyn OrderRepository>,
    pub cart_repo: Arc<dyn CartRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub location_repo: Arc<dyn LocationRepository>,
    pub product_repo: Arc<dyn ProductRepository>,
    pub student_repo: Arc<dyn StudentRepository>,
    pub template_repo: Arc<dyn TemplateRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub order_repo: Arc<dyn OrderRepository>,
    pub cart_repo: Arc<dyn CartRepository>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub event_generator: Arc<EventGenerator>,
    pub reconciler: Arc<BookingReconciler>,
    pub payment_service: Arc<PaymentService>,
    pub checkout_service: Arc<CheckoutService>,
    pub calendar_service: Arc<CalendarService>,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories, payment_gateway: Arc<dyn PaymentGateway>) -> Self {
        let retry = RetryPolicy {
            max_retries: config.payment_max_retries,
            ..RetryPolicy::default()
        };
        let lease = LeaseSettings {
            ttl: config.reconcile_lease,
            ..LeaseSettings::default()
        };

        let event_generator = Arc::new(EventGenerator::new(
            repos.template_repo.clone(),
            repos.location_repo.clone(),
            repos.event_repo.clone(),
        ));
        let reconciler = Arc::new(BookingReconciler::new(
            repos.order_repo.clone(),
            repos.booking_repo.clone(),
            repos.event_repo.clone(),
            repos.location_repo.clone(),
            Arc::new(OrderLocks::new()),
            lease,
        ));
        let payment_service = Arc::new(PaymentService::new(
            payment_gateway.clone(),
            repos.order_repo.clone(),
            reconciler.clone(),
            retry.clone(),
        ));
        let checkout_service = Arc::new(CheckoutService::new(
            repos.cart_repo.clone(),
            repos.product_repo.clone(),
            repos.location_repo.clone(),
            repos.student_repo.clone(),
            repos.order_repo.clone(),
            payment_gateway.clone(),
            config.currency.clone(),
            retry,
        ));
        let calendar_service = Arc::new(CalendarService::new(
            repos.event_repo.clone(),
            repos.location_repo.clone(),
            config.default_timezone,
        ));

        Self {
            config,
            location_repo: repos.location_repo,
            product_repo: repos.product_repo,
            student_repo: repos.student_repo,
            template_repo: repos.template_repo,
            event_repo: repos.event_repo,
            booking_repo: repos.booking_repo,
            order_repo: repos.order_repo,
            cart_repo: repos.cart_repo,
            payment_gateway,
            event_generator,
            reconciler,
            payment_service,
            checkout_service,
            calendar_service,
        }
    }
}
