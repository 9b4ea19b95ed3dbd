//! Notification gateway API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use gateway_common::config::AppConfig;
use gateway_common::db::create_pool;
use gateway_notifier::{
    ConfigNotifierFactory, DeliveryCycle, NotificationWorker, PgNotificationRepository,
};

use gateway_api::routes::create_router;
use gateway_api::state::AppState;

const DEFAULT_LOG_FILTER: &str = "gateway_api=info,gateway_notifier=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if config.is_dev_mode() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    }

    tracing::info!(environment = %config.environment, "Starting notification gateway...");

    // Create database connection pool and apply migrations
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database pool created, migrations applied");

    tracing::info!(
        email = config.channels.email.is_some(),
        chat_webhook = config.channels.chat_webhook.is_some(),
        "Delivery channels configured"
    );

    // Build and start the delivery worker
    let repository = Arc::new(PgNotificationRepository::new(pool));
    let factory = Arc::new(ConfigNotifierFactory::new(
        Arc::new(config.channels.clone()),
        config.worker.delivery_timeout,
    ));
    let cycle = DeliveryCycle::new(repository.clone(), factory, &config.worker);
    let worker = NotificationWorker::new(cycle, &config.worker);
    worker.start()?;

    // Build application state and router
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(repository, worker.clone(), config);
    let app = create_router(state);

    // Start server
    tracing::info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker.stop().await;
    tracing::info!("Notification gateway shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
