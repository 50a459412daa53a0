/// Portfolio membership model and database operations
///
/// A portfolio entry records that one user tracks one symbol. The
/// (user_id, symbol) pair is unique; adding the same symbol twice is a
/// no-op surfaced to the caller.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE portfolio_entries (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     symbol VARCHAR(20) NOT NULL REFERENCES stocks(symbol) ON DELETE CASCADE,
///     added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, symbol)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One (user, symbol) membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PortfolioEntry {
    /// Unique entry ID (UUID v4)
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Tracked ticker symbol
    pub symbol: String,

    /// When the symbol was added to the portfolio
    pub added_at: DateTime<Utc>,
}

/// A membership row joined with the catalog's display name
///
/// This is what the summary composer and the portfolio listing endpoint
/// work with.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PortfolioSymbol {
    /// Tracked ticker symbol
    pub symbol: String,

    /// Company display name from the catalog
    pub company_name: String,

    /// When the symbol was added to the portfolio
    pub added_at: DateTime<Utc>,
}

impl PortfolioEntry {
    /// Adds a symbol to a user's portfolio
    ///
    /// # Returns
    ///
    /// The new entry, or None if the (user, symbol) pair already exists
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The symbol is not in the stock catalog (foreign key violation)
    /// - Database connection fails
    pub async fn add(
        pool: &PgPool,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let entry = sqlx::query_as::<_, PortfolioEntry>(
            r#"
            INSERT INTO portfolio_entries (user_id, symbol)
            VALUES ($1, $2)
            ON CONFLICT (user_id, symbol) DO NOTHING
            RETURNING id, user_id, symbol, added_at
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Removes a symbol from a user's portfolio
    ///
    /// # Returns
    ///
    /// True if an entry was removed, false if the user was not tracking
    /// the symbol
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn remove(pool: &PgPool, user_id: Uuid, symbol: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM portfolio_entries WHERE user_id = $1 AND symbol = $2",
        )
        .bind(user_id)
        .bind(symbol)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks whether a user is tracking a symbol
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn contains(pool: &PgPool, user_id: Uuid, symbol: &str) -> Result<bool, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM portfolio_entries
                WHERE user_id = $1 AND symbol = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_one(pool)
        .await?;

        Ok(exists.0)
    }

    /// Lists a user's tracked symbols with their display names
    ///
    /// Ordered by when each symbol was added, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<PortfolioSymbol>, sqlx::Error> {
        let symbols = sqlx::query_as::<_, PortfolioSymbol>(
            r#"
            SELECT p.symbol, s.company_name, p.added_at
            FROM portfolio_entries p
            JOIN stocks s ON s.symbol = p.symbol
            WHERE p.user_id = $1
            ORDER BY p.added_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(symbols)
    }
}
