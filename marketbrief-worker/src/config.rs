/// Configuration for the reminder worker
///
/// Loads configuration from environment variables into a type-safe
/// struct. A `.env` file is honored in development.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 5)
/// - `SCHEDULER_TICK_SECONDS`: dispatch loop interval (default: 60)
/// - `SCHEDULER_DISPATCH_TIMEOUT_SECONDS`: per-user dispatch budget
///   (default: 30)
/// - `MAIL_RELAY_URL`: mail relay endpoint (required)
/// - `MAIL_RELAY_TOKEN`: mail relay bearer token (required)
/// - `MAIL_FROM_ADDRESS`: From address on outbound mail (required)
/// - `MAIL_TIMEOUT_SECONDS`: mail relay timeout (default: 15)
/// - `FRONTEND_URL`: base URL for links in emails (required)
/// - `RUST_LOG`: log filter (default: info)

use std::env;

use marketbrief_shared::mailer::MailerConfig;

use crate::scheduler::SchedulerConfig;

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    ///
    /// The worker only issues one query batch per tick, so the pool
    /// stays small.
    pub database_max_connections: u32,

    /// Dispatch loop settings
    pub scheduler: SchedulerConfig,

    /// Outbound mail settings
    pub mail: MailerConfig,
}

impl WorkerConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let tick_interval_secs = env::var("SCHEDULER_TICK_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()?;

        let dispatch_timeout_secs = env::var("SCHEDULER_DISPATCH_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()?;

        let relay_url = env::var("MAIL_RELAY_URL")
            .map_err(|_| anyhow::anyhow!("MAIL_RELAY_URL environment variable is required"))?;
        let relay_token = env::var("MAIL_RELAY_TOKEN")
            .map_err(|_| anyhow::anyhow!("MAIL_RELAY_TOKEN environment variable is required"))?;
        let from_address = env::var("MAIL_FROM_ADDRESS")
            .map_err(|_| anyhow::anyhow!("MAIL_FROM_ADDRESS environment variable is required"))?;
        let mail_timeout_seconds = env::var("MAIL_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<u64>()?;
        let frontend_url = env::var("FRONTEND_URL")
            .map_err(|_| anyhow::anyhow!("FRONTEND_URL environment variable is required"))?;

        Ok(WorkerConfig {
            database_url,
            database_max_connections,
            scheduler: SchedulerConfig {
                tick_interval_secs,
                dispatch_timeout_secs,
            },
            mail: MailerConfig {
                relay_url,
                relay_token,
                from_address,
                frontend_url,
                timeout_seconds: mail_timeout_seconds,
            },
        })
    }
}
