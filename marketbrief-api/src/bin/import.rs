//! # Stock catalog import
//!
//! Downloads the provider's LISTING_STATUS CSV with an operator-level
//! API key and replaces the `stocks` catalog in one transaction.
//! Symbols absent from the download are marked delisted rather than
//! deleted, so existing portfolio rows stay valid.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... PROVIDER_API_KEY=... \
//!     cargo run -p marketbrief-api --bin marketbrief-import
//! ```

use marketbrief_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    models::stock::{CatalogRow, Stock},
};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// One row of the LISTING_STATUS CSV
///
/// The download also carries exchange, assetType, ipoDate, and
/// delistingDate columns; serde ignores them.
#[derive(Debug, Deserialize)]
struct ListingRow {
    symbol: String,
    name: String,
    #[serde(default)]
    status: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketbrief_import=info,marketbrief_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
    let api_key = env::var("PROVIDER_API_KEY")
        .map_err(|_| anyhow::anyhow!("PROVIDER_API_KEY environment variable is required"))?;
    let base_url = env::var("PROVIDER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    let url = reqwest::Url::parse_with_params(
        &base_url,
        &[("function", "LISTING_STATUS"), ("apikey", api_key.as_str())],
    )?;

    info!("Downloading listing catalog");
    let body = reqwest::get(url).await?.error_for_status()?.text().await?;

    // A throttled or failing provider answers with a JSON body under
    // HTTP 200 instead of CSV
    if body.trim_start().starts_with('{') {
        anyhow::bail!("Provider returned an error payload instead of CSV: {}", body.trim());
    }

    let rows = parse_active_listings(body.as_bytes());
    anyhow::ensure!(
        !rows.is_empty(),
        "Listing download contained no active symbols"
    );
    info!(count = rows.len(), "Parsed active listings");

    let pool = create_pool(DatabaseConfig {
        url: database_url,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let listed = Stock::replace_catalog(&pool, &rows).await?;
    info!(listed, "Catalog import complete");

    Ok(())
}

/// Parses the LISTING_STATUS CSV, keeping only active symbols
///
/// Rows that fail to parse are skipped with a warning; one stray line
/// in a 10k-row download should not abort the import.
fn parse_active_listings(csv_bytes: &[u8]) -> Vec<CatalogRow> {
    let mut reader = csv::Reader::from_reader(csv_bytes);
    let mut rows = Vec::new();

    for record in reader.deserialize::<ListingRow>() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Skipping malformed listing row");
                continue;
            }
        };

        if row.status.eq_ignore_ascii_case("active") && !row.symbol.is_empty() {
            rows.push(CatalogRow {
                symbol: row.symbol.to_uppercase(),
                company_name: row.name,
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
symbol,name,exchange,assetType,ipoDate,delistingDate,status
AAPL,Apple Inc,NASDAQ,Stock,1980-12-12,null,Active
MSFT,Microsoft Corporation,NASDAQ,Stock,1986-03-13,null,Active
OLDCO,Old Company,NYSE,Stock,1990-01-01,2020-06-01,Delisted
";

    #[test]
    fn test_keeps_only_active_rows() {
        let rows = parse_active_listings(SAMPLE.as_bytes());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].company_name, "Apple Inc");
        assert_eq!(rows[1].symbol, "MSFT");
    }

    #[test]
    fn test_uppercases_symbols() {
        let csv = "symbol,name,status\nbrk.b,Berkshire Hathaway,Active\n";
        let rows = parse_active_listings(csv.as_bytes());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "BRK.B");
    }

    #[test]
    fn test_skips_malformed_rows() {
        let csv = "symbol,name,status\nAAPL,Apple Inc,Active\n\"unterminated\n";
        let rows = parse_active_listings(csv.as_bytes());

        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_no_rows() {
        assert!(parse_active_listings(b"symbol,name,status\n").is_empty());
    }
}
