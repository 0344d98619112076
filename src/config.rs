use std::env;
use std::time::Duration;
use chrono_tz::Tz;
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub default_timezone: Tz,
    pub currency: String,
    pub stripe_api_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub payment_timeout: Duration,
    pub payment_max_retries: u32,
    pub reconcile_lease: Duration,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Validation("DATABASE_URL must be set".into()))?;

        let default_timezone = env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| "Australia/Sydney".to_string());
        let default_timezone: Tz = default_timezone
            .parse()
            .map_err(|_| AppError::InvalidTimezone(default_timezone.clone()))?;

        Ok(Self {
            database_url,
            port: parse_var("PORT", 3000)?,
            default_timezone,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "aud".to_string()),
            stripe_api_url: env::var("STRIPE_API_URL").unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .map_err(|_| AppError::Validation("STRIPE_SECRET_KEY must be set".into()))?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .map_err(|_| AppError::Validation("STRIPE_WEBHOOK_SECRET must be set".into()))?,
            payment_timeout: Duration::from_millis(parse_var("PAYMENT_TIMEOUT_MS", 5000)?),
            payment_max_retries: parse_var("PAYMENT_MAX_RETRIES", 3)?,
            reconcile_lease: Duration::from_secs(parse_var("RECONCILE_LEASE_SECS", 30)?),
            sweep_interval: Duration::from_secs(parse_var("SWEEP_INTERVAL_SECS", 60)?),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Validation(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}
