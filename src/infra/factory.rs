use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::error::AppError;
use crate::infra::payment::stripe_gateway::StripeGateway;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_cart_repo::PostgresCartRepo,
    postgres_event_repo::PostgresEventRepo, postgres_location_repo::PostgresLocationRepo,
    postgres_order_repo::PostgresOrderRepo, postgres_product_repo::PostgresProductRepo,
    postgres_student_repo::PostgresStudentRepo, postgres_template_repo::PostgresTemplateRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_cart_repo::SqliteCartRepo,
    sqlite_event_repo::SqliteEventRepo, sqlite_location_repo::SqliteLocationRepo,
    sqlite_order_repo::SqliteOrderRepo, sqlite_product_repo::SqliteProductRepo,
    sqlite_student_repo::SqliteStudentRepo, sqlite_template_repo::SqliteTemplateRepo,
};
use crate::state::{AppState, Repositories};

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let database_url = &config.database_url;

    let repos = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let opts: PgConnectOptions = database_url.parse()?;
        let opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;

        run_postgres_migrations(&pool).await?;
        postgres_repositories(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        run_sqlite_migrations(&pool).await?;
        sqlite_repositories(pool)
    };

    let gateway = Arc::new(StripeGateway::new(
        config.stripe_api_url.clone(),
        config.stripe_secret_key.clone(),
        config.payment_timeout,
    )?);

    Ok(AppState::new(config.clone(), repos, gateway))
}

pub fn sqlite_repositories(pool: SqlitePool) -> Repositories {
    Repositories {
        location_repo: Arc::new(SqliteLocationRepo::new(pool.clone())),
        product_repo: Arc::new(SqliteProductRepo::new(pool.clone())),
        student_repo: Arc::new(SqliteStudentRepo::new(pool.clone())),
        template_repo: Arc::new(SqliteTemplateRepo::new(pool.clone())),
        event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
        booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
        order_repo: Arc::new(SqliteOrderRepo::new(pool.clone())),
        cart_repo: Arc::new(SqliteCartRepo::new(pool)),
    }
}

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        location_repo: Arc::new(PostgresLocationRepo::new(pool.clone())),
        product_repo: Arc::new(PostgresProductRepo::new(pool.clone())),
        student_repo: Arc::new(PostgresStudentRepo::new(pool.clone())),
        template_repo: Arc::new(PostgresTemplateRepo::new(pool.clone())),
        event_repo: Arc::new(PostgresEventRepo::new(pool.clone())),
        booking_repo: Arc::new(PostgresBookingRepo::new(pool.clone())),
        order_repo: Arc::new(PostgresOrderRepo::new(pool.clone())),
        cart_repo: Arc::new(PostgresCartRepo::new(pool)),
    }
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres").run(pool).await?;
    Ok(())
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    Ok(())
}
