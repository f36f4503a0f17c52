//! Postgres connection pool wiring.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::instrument;

use crate::config::DatabaseConfig;
use crate::store::postgres::map_sqlx_error;
use crate::store::StoreError;

/// Open a pool with the configured limits and make sure the database answers.
#[instrument(skip(config), fields(max_connections = config.max_connections), err)]
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| map_sqlx_error("ping", e))?;

    tracing::info!("database pool ready");
    Ok(pool)
}
