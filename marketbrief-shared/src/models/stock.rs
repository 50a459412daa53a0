/// Stock catalog model and database operations
///
/// The stocks table is the searchable catalog of listed symbols. It is
/// populated by the bulk catalog import and never written by user requests.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE stocks (
///     symbol VARCHAR(20) PRIMARY KEY,
///     company_name VARCHAR(255) NOT NULL,
///     is_listed BOOLEAN NOT NULL DEFAULT TRUE
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

/// A catalog entry for one tradable symbol
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Stock {
    /// Ticker symbol, stored uppercase (e.g. "AAPL")
    pub symbol: String,

    /// Company display name
    pub company_name: String,

    /// Whether the symbol is currently listed
    ///
    /// Symbols missing from the latest catalog import are kept but marked
    /// delisted so existing portfolio rows stay valid
    pub is_listed: bool,
}

/// One row of a catalog import
#[derive(Debug, Clone)]
pub struct CatalogRow {
    pub symbol: String,
    pub company_name: String,
}

impl Stock {
    /// Finds a catalog entry by symbol
    ///
    /// # Returns
    ///
    /// The entry if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_symbol(pool: &PgPool, symbol: &str) -> Result<Option<Self>, sqlx::Error> {
        let stock = sqlx::query_as::<_, Stock>(
            r#"
            SELECT symbol, company_name, is_listed
            FROM stocks
            WHERE symbol = $1
            "#,
        )
        .bind(symbol)
        .fetch_optional(pool)
        .await?;

        Ok(stock)
    }

    /// Searches listed symbols by keyword
    ///
    /// Matches case-insensitively against the symbol and the company name.
    /// Results are ordered by symbol for stable pagination.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `keywords` - Substring to match (no wildcards; they are added here)
    /// * `limit` - Maximum number of entries to return
    /// * `offset` - Number of entries to skip (for pagination)
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn search(
        pool: &PgPool,
        keywords: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", keywords);

        let stocks = sqlx::query_as::<_, Stock>(
            r#"
            SELECT symbol, company_name, is_listed
            FROM stocks
            WHERE is_listed = TRUE
              AND (symbol ILIKE $1 OR company_name ILIKE $1)
            ORDER BY symbol
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(stocks)
    }

    /// Lists listed symbols with pagination
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let stocks = sqlx::query_as::<_, Stock>(
            r#"
            SELECT symbol, company_name, is_listed
            FROM stocks
            WHERE is_listed = TRUE
            ORDER BY symbol
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(stocks)
    }

    /// Replaces the catalog with a fresh import
    ///
    /// Runs in one transaction: every existing symbol is first marked
    /// delisted, then the imported rows are upserted with `is_listed = TRUE`.
    /// Symbols absent from the import stay in the table as delisted rather
    /// than being deleted, so portfolio rows that reference them survive.
    ///
    /// # Returns
    ///
    /// The number of listed symbols after the import
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails or the transaction
    /// cannot commit
    pub async fn replace_catalog(
        pool: &PgPool,
        rows: &[CatalogRow],
    ) -> Result<u64, sqlx::Error> {
        let symbols: Vec<String> = rows.iter().map(|r| r.symbol.clone()).collect();
        let names: Vec<String> = rows.iter().map(|r| r.company_name.clone()).collect();

        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE stocks SET is_listed = FALSE")
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO stocks (symbol, company_name, is_listed)
            SELECT symbol, company_name, TRUE
            FROM UNNEST($1::varchar[], $2::varchar[]) AS t(symbol, company_name)
            ON CONFLICT (symbol) DO UPDATE
            SET company_name = EXCLUDED.company_name,
                is_listed = TRUE
            "#,
        )
        .bind(&symbols)
        .bind(&names)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(listed = result.rows_affected(), "Stock catalog replaced");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_row_fields() {
        let row = CatalogRow {
            symbol: "AAPL".to_string(),
            company_name: "Apple Inc".to_string(),
        };

        assert_eq!(row.symbol, "AAPL");
        assert_eq!(row.company_name, "Apple Inc");
    }

    // Integration tests for database operations are in the crate's
    // tests/ directory
}
