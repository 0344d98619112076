use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub address: String,
    pub capacity: i32,
    pub timezone: String,
    pub allowed_camp_types: Option<Vec<String>>,
    pub allowed_dates: Option<Vec<NaiveDate>>,
}

/// Absent fields are left unchanged.
#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
    pub allowed_camp_types: Option<Vec<String>>,
    pub allowed_dates: Option<Vec<NaiveDate>>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub product_type: String,
    /// Minor currency units.
    pub price: i64,
}

#[derive(Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub title: String,
    pub camp_type: String,
    pub product_id: String,
    pub location_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Local wall-clock time, `HH:MM`.
    pub start_time: String,
    pub end_time: String,
    /// Weekday names (`"mon"`, `"Tuesday"`, ...). Takes precedence over `weekday_mask`.
    pub weekdays: Option<Vec<String>>,
    pub weekday_mask: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub camp_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub weekdays: Option<Vec<String>>,
    pub weekday_mask: Option<i32>,
}

#[derive(Deserialize)]
pub struct CalendarParams {
    pub from: String,
    pub to: String,
    pub location_id: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: String,
    pub student_id: String,
    pub location_id: String,
    /// RFC 3339 instant, or a `YYYY-MM-DD` day at the location.
    pub booking_date: String,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub customer_email: String,
    pub customer_name: String,
}

#[derive(Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}
