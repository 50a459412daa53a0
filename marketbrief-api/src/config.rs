/// Configuration management for the API server
///
/// Loads configuration from environment variables into a type-safe
/// struct. A `.env` file is honored in development.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: *)
/// - `PRODUCTION`: enables HSTS and strict CORS (default: false)
/// - `JWT_SECRET`: secret key for JWT signing (required, >= 32 chars)
/// - `PROVIDER_BASE_URL`: quote provider endpoint
///   (default: https://www.alphavantage.co/query)
/// - `PROVIDER_TIMEOUT_SECONDS`: quote fetch timeout (default: 10)
/// - `MAIL_RELAY_URL`: mail relay endpoint (required)
/// - `MAIL_RELAY_TOKEN`: mail relay bearer token (required)
/// - `MAIL_FROM_ADDRESS`: From address on outbound mail (required)
/// - `MAIL_TIMEOUT_SECONDS`: mail relay timeout (default: 15)
/// - `FRONTEND_URL`: base URL for links in emails (required)
/// - `RUST_LOG`: log filter (default: info)
///
/// # Example
///
/// ```no_run
/// use marketbrief_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Quote provider configuration
    pub provider: ProviderConfig,

    /// Outbound mail configuration
    pub mail: MailConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins ("*" for permissive development mode)
    pub cors_origins: Vec<String>,

    /// Production mode flag (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Quote provider configuration
///
/// Requests are made with each user's own provider key; only the
/// endpoint and the timeout are server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider query endpoint
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Mail relay endpoint
    pub relay_url: String,

    /// Mail relay bearer token
    pub relay_token: String,

    /// From address stamped on outbound mail
    pub from_address: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Base URL of the web frontend, used for links in mail bodies
    pub frontend_url: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value
    /// fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = env::var("PRODUCTION")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let provider_base_url = env::var("PROVIDER_BASE_URL")
            .unwrap_or_else(|_| "https://www.alphavantage.co/query".to_string());
        let provider_timeout = env::var("PROVIDER_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()?;

        let relay_url = env::var("MAIL_RELAY_URL")
            .map_err(|_| anyhow::anyhow!("MAIL_RELAY_URL environment variable is required"))?;
        let relay_token = env::var("MAIL_RELAY_TOKEN")
            .map_err(|_| anyhow::anyhow!("MAIL_RELAY_TOKEN environment variable is required"))?;
        let from_address = env::var("MAIL_FROM_ADDRESS")
            .map_err(|_| anyhow::anyhow!("MAIL_FROM_ADDRESS environment variable is required"))?;
        let mail_timeout = env::var("MAIL_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<u64>()?;
        let frontend_url = env::var("FRONTEND_URL")
            .map_err(|_| anyhow::anyhow!("FRONTEND_URL environment variable is required"))?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            provider: ProviderConfig {
                base_url: provider_base_url,
                timeout_seconds: provider_timeout,
            },
            mail: MailConfig {
                relay_url,
                relay_token,
                from_address,
                timeout_seconds: mail_timeout,
                frontend_url,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            provider: ProviderConfig {
                base_url: "https://www.alphavantage.co/query".to_string(),
                timeout_seconds: 10,
            },
            mail: MailConfig {
                relay_url: "https://relay.test/send".to_string(),
                relay_token: "token".to_string(),
                from_address: "digest@marketbrief.test".to_string(),
                timeout_seconds: 15,
                frontend_url: "https://app.marketbrief.test".to_string(),
            },
        };

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
