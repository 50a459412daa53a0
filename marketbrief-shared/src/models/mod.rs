/// Database models for MarketBrief
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, reminder settings, and the provider API key
/// - `stock`: The listed-stock catalog used for symbol search
/// - `portfolio`: Which symbols each user tracks
/// - `quote_cache`: Last fetched quote per (user, symbol)
///
/// # Example
///
/// ```no_run
/// use marketbrief_shared::models::user::{User, CreateUser};
/// use marketbrief_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jane Doe".to_string()),
///     provider_api_key: "demo-provider-key".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod portfolio;
pub mod quote_cache;
pub mod stock;
pub mod user;
