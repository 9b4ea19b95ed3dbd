use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

/// Name reported in `pg_stat_activity`.
const APPLICATION_NAME: &str = "notification-gateway";

/// Wait for a free connection before a query fails instead of queueing forever.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Smallest pool that lets intake requests run while the worker holds a
/// connection for its current cycle.
const MIN_CONNECTIONS: u32 = 2;

/// Create the PostgreSQL pool shared by the HTTP handlers and the delivery
/// worker.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let options: PgConnectOptions = database_url
        .parse()
        .context("DATABASE_URL is not a valid PostgreSQL connection string")?;

    let max_connections = pool_size(max_connections);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options.application_name(APPLICATION_NAME))
        .await?;

    tracing::info!(max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

fn pool_size(requested: u32) -> u32 {
    if requested < MIN_CONNECTIONS {
        tracing::warn!(
            requested,
            using = MIN_CONNECTIONS,
            "DB_MAX_CONNECTIONS too small for intake and worker, raising it"
        );
        return MIN_CONNECTIONS;
    }
    requested
}
