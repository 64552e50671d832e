pub mod postgres_courier_repository;
pub mod postgres_delivery_repository;

pub use postgres_courier_repository::*;
pub use postgres_delivery_repository::*;

use dispatch_config::DatabaseConfig;
use dispatch_core::DispatchResult;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

/// Open a pool sized from configuration.
pub async fn connect_pool(config: &DatabaseConfig) -> DispatchResult<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the bundled schema migrations.
pub async fn run_migrations(pool: &PgPool) -> DispatchResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| dispatch_core::DispatchError::Database(e.into()))?;
    info!("database migrations applied");
    Ok(())
}
