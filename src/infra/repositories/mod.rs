pub mod sqlite_booking_repo;
pub mod sqlite_cart_repo;
pub mod sqlite_event_repo;
pub mod sqlite_location_repo;
pub mod sqlite_order_repo;
pub mod sqlite_product_repo;
pub mod sqlite_student_repo;
pub mod sqlite_template_repo;

pub mod postgres_booking_repo;
pub mod postgres_cart_repo;
pub mod postgres_event_repo;
pub mod postgres_location_repo;
pub mod postgres_order_repo;
pub mod postgres_product_repo;
pub mod postgres_student_repo;
pub mod postgres_template_repo;
