//! # MarketBrief Worker
//!
//! Long-running process that sends each user their daily portfolio
//! summary email at their configured local time. Shares the PostgreSQL
//! database with the API server; mail goes out through the same HTTP
//! relay the API uses for account emails.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p marketbrief-worker
//! ```

use std::sync::Arc;

use marketbrief_shared::db::{
    migrations::run_migrations,
    pool::{create_pool, DatabaseConfig},
};
use marketbrief_shared::mailer::Mailer;
use marketbrief_worker::config::WorkerConfig;
use marketbrief_worker::notifier::EmailNotifier;
use marketbrief_worker::scheduler::ReminderScheduler;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "marketbrief_worker=debug,marketbrief_shared=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "MarketBrief Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: config.database_max_connections,
        ..Default::default()
    })
    .await?;

    // Migrations take an advisory lock, so racing the API server is fine
    run_migrations(&pool).await?;

    let notifier = Arc::new(EmailNotifier::new(Mailer::new(config.mail.clone())));
    let scheduler = ReminderScheduler::with_config(pool, notifier, config.scheduler.clone());
    let shutdown_token = scheduler.shutdown_token();

    let scheduler_handle = tokio::spawn(async move { scheduler.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping scheduler");
    shutdown_token.cancel();

    scheduler_handle.await??;
    tracing::info!("Worker shut down");

    Ok(())
}
