/// Portfolio summary composer
///
/// Builds the display-ready daily summary for one user entirely from the
/// quote cache. No network calls happen here: whatever was cached at
/// compose time is what the user sees, and symbols that have never been
/// refreshed still get a row with every quote field marked "N/A". The
/// same rows back both the summary API response and the emailed digest.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const NOT_AVAILABLE: &str = "N/A";

/// One display-ready summary row
///
/// All fields are pre-formatted strings so renderers (JSON response,
/// HTML digest) never re-derive numbers. Field order matches the digest
/// table's column order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryRow {
    pub ticker: String,
    pub name: String,
    pub price: String,
    pub change: String,
    pub change_percent: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub volume: String,
    pub previous_close: String,
    pub latest_trading_day: String,
}

impl SummaryRow {
    /// True when every quote field is the "N/A" marker
    pub fn is_unavailable(&self) -> bool {
        self.price == NOT_AVAILABLE
    }
}

/// Raw join output: portfolio membership plus optional cached quote
#[derive(Debug, sqlx::FromRow)]
struct ComposedRow {
    symbol: String,
    company_name: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    price: Option<f64>,
    volume: Option<i64>,
    latest_trading_day: Option<String>,
    previous_close: Option<f64>,
    change: Option<f64>,
    change_percent: Option<String>,
}

impl From<ComposedRow> for SummaryRow {
    fn from(row: ComposedRow) -> Self {
        SummaryRow {
            ticker: row.symbol,
            name: row.company_name,
            price: format_optional_money(row.price),
            change: format_optional_money(row.change),
            change_percent: row.change_percent.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            open: format_optional_money(row.open),
            high: format_optional_money(row.high),
            low: format_optional_money(row.low),
            volume: row.volume.map_or_else(|| NOT_AVAILABLE.to_string(), format_volume),
            previous_close: format_optional_money(row.previous_close),
            latest_trading_day: row
                .latest_trading_day
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

/// Composes the summary rows for a user's whole portfolio
///
/// One row per portfolio membership, in the order symbols were added.
/// A single LEFT JOIN pulls the user's own cached quotes; rows without a
/// cache hit come back with every quote field "N/A". An empty portfolio
/// composes to an empty vec, which callers treat as "nothing to send",
/// not an error.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn compose_summary(pool: &PgPool, user_id: Uuid) -> Result<Vec<SummaryRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ComposedRow>(
        r#"
        SELECT p.symbol, s.company_name,
               q.open, q.high, q.low, q.price, q.volume,
               q.latest_trading_day, q.previous_close, q.change, q.change_percent
        FROM portfolio_entries p
        JOIN stocks s ON s.symbol = p.symbol
        LEFT JOIN quote_cache q
            ON q.user_id = p.user_id AND q.symbol = p.symbol
        WHERE p.user_id = $1
        ORDER BY p.added_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SummaryRow::from).collect())
}

fn format_optional_money(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${:.2}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Formats a share count with thousands separators ("44,923,941")
fn format_volume(volume: i64) -> String {
    let digits = volume.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if volume < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
