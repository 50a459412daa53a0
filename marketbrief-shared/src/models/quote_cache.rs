/// Quote cache model
///
/// The most recent quote snapshot each user has fetched for each symbol.
/// Rows are keyed by (user_id, symbol) and replaced wholesale on refresh,
/// so two users tracking the same ticker keep fully independent snapshots.
/// Rows are only ever written from a successfully parsed provider
/// response; a failed fetch leaves the previous snapshot untouched.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE quote_cache (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     symbol VARCHAR(20) NOT NULL,
///     open DOUBLE PRECISION NOT NULL,
///     high DOUBLE PRECISION NOT NULL,
///     low DOUBLE PRECISION NOT NULL,
///     price DOUBLE PRECISION NOT NULL,
///     volume BIGINT NOT NULL,
///     latest_trading_day VARCHAR(20) NOT NULL,
///     previous_close DOUBLE PRECISION NOT NULL,
///     change DOUBLE PRECISION NOT NULL,
///     change_percent VARCHAR(20) NOT NULL,
///     last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, symbol)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::quotes::Quote;

const CACHE_COLUMNS: &str = "id, user_id, symbol, open, high, low, price, volume, \
     latest_trading_day, previous_close, change, change_percent, last_updated";

/// A cached quote snapshot owned by one user
///
/// Column names match the [`Quote`] field names one-to-one; the only
/// additions are the row identity and the `last_updated` staleness marker.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuoteCacheEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub price: f64,
    pub volume: i64,
    pub latest_trading_day: String,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: String,
    /// When this snapshot was last written
    pub last_updated: DateTime<Utc>,
}

impl QuoteCacheEntry {
    /// Inserts or replaces the cached snapshot for (user, symbol)
    ///
    /// A single atomic statement: when two refreshes of the same pair
    /// race, the cache settles on one writer's complete row, never an
    /// interleaving of the two.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `user_id` - Owner of the cache row
    /// * `quote` - Parsed provider snapshot to store
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the write fails.
    pub async fn upsert(pool: &PgPool, user_id: Uuid, quote: &Quote) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, QuoteCacheEntry>(&format!(
            r#"
            INSERT INTO quote_cache (
                user_id, symbol, open, high, low, price, volume,
                latest_trading_day, previous_close, change, change_percent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, symbol) DO UPDATE SET
                open = EXCLUDED.open,
                high = EXCLUDED.high,
                low = EXCLUDED.low,
                price = EXCLUDED.price,
                volume = EXCLUDED.volume,
                latest_trading_day = EXCLUDED.latest_trading_day,
                previous_close = EXCLUDED.previous_close,
                change = EXCLUDED.change,
                change_percent = EXCLUDED.change_percent,
                last_updated = NOW()
            RETURNING {CACHE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&quote.symbol)
        .bind(quote.open)
        .bind(quote.high)
        .bind(quote.low)
        .bind(quote.price)
        .bind(quote.volume)
        .bind(&quote.latest_trading_day)
        .bind(quote.previous_close)
        .bind(quote.change)
        .bind(&quote.change_percent)
        .fetch_one(pool)
        .await?;

        debug!(
            user_id = %user_id,
            symbol = %quote.symbol,
            price = quote.price,
            "Cached quote snapshot"
        );

        Ok(entry)
    }

    /// Looks up the cached snapshot for (user, symbol)
    ///
    /// Returns `None` when the user has never successfully refreshed the
    /// symbol; callers surface that as "N/A", never a fabricated quote.
    pub async fn get(
        pool: &PgPool,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, QuoteCacheEntry>(&format!(
            r#"
            SELECT {CACHE_COLUMNS}
            FROM quote_cache
            WHERE user_id = $1 AND symbol = $2
            "#
        ))
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(pool)
        .await
    }
}
