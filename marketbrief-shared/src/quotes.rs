/// Quote provider client
///
/// Fetches point-in-time quote snapshots from an Alpha-Vantage-compatible
/// GLOBAL_QUOTE endpoint. The provider's numbered JSON keys ("05. price"
/// and friends) are parsed here, once, into the typed [`Quote`] record;
/// nothing outside this module ever sees raw provider field names.
///
/// Every fetch is made with the calling user's own API key. The key is
/// never logged.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Error type for quote provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider does not know the requested symbol
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rejected the request due to rate limiting
    #[error("Provider rate limit exceeded")]
    RateLimited,

    /// The request to the provider timed out
    #[error("Provider request timed out")]
    Timeout,

    /// The provider responded but the body could not be parsed
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// Transport failure or a non-success status from the provider
    #[error("Provider error: {0}")]
    Upstream(String),
}

/// A typed quote snapshot for one symbol
///
/// All numeric fields are parsed from the provider's string-encoded
/// values. `change_percent` stays a provider-formatted string (e.g.
/// "1.2345%") because it is only ever displayed, never computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
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
}

/// GLOBAL_QUOTE response envelope
///
/// The provider reports errors in-band: a missing or empty "Global Quote"
/// object, an "Error Message", or a "Note"/"Information" string for rate
/// limiting, all under HTTP 200.
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuotePayload>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuotePayload {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// Client for the quote provider's HTTP API
#[derive(Debug, Clone)]
pub struct QuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    /// Creates a client with the given request timeout
    ///
    /// The timeout bounds the whole request so a stalled provider cannot
    /// block a caller indefinitely.
    pub fn new(timeout_seconds: u64) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_seconds)
    }

    /// Creates a client against a non-default endpoint
    pub fn with_base_url(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetches the latest quote for a symbol using the caller's API key
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] distinguishing unknown symbols, rate
    /// limiting, timeouts, malformed bodies, and other upstream failures.
    pub async fn fetch_global_quote(
        &self,
        symbol: &str,
        api_key: &str,
    ) -> Result<Quote, ProviderError> {
        let params = [
            ("function", "GLOBAL_QUOTE"),
            ("symbol", symbol),
            ("apikey", api_key),
        ];

        let url = reqwest::Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| ProviderError::Upstream(format!("Failed to build URL: {}", e)))?;

        debug!(
            symbol = %symbol,
            "Fetching quote: {}",
            url.as_str().replace(api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Upstream(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Upstream(format!("HTTP {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Upstream(e.to_string()))?;

        Self::parse_response(&text, symbol)
    }

    /// Parses a GLOBAL_QUOTE response body into a typed quote
    ///
    /// Split out from the network path so the envelope handling is unit
    /// testable against recorded provider bodies.
    fn parse_response(text: &str, symbol: &str) -> Result<Quote, ProviderError> {
        let response: GlobalQuoteResponse = serde_json::from_str(text)
            .map_err(|e| ProviderError::Malformed(format!("Failed to parse response: {}", e)))?;

        if let Some(msg) = response.error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(ProviderError::SymbolNotFound(symbol.to_string()));
            }
            return Err(ProviderError::Upstream(msg));
        }

        // "Note"/"Information" under HTTP 200 usually means rate limiting
        for msg in [response.note, response.information].into_iter().flatten() {
            if msg.contains("API call frequency")
                || msg.contains("rate limit")
                || msg.contains("requests per day")
            {
                return Err(ProviderError::RateLimited);
            }
            warn!(symbol = %symbol, "Provider notice: {}", msg);
        }

        let payload = response
            .global_quote
            .ok_or_else(|| ProviderError::SymbolNotFound(symbol.to_string()))?;

        // An unknown symbol comes back as an empty "Global Quote" object
        if payload.symbol.is_none() && payload.price.is_none() {
            return Err(ProviderError::SymbolNotFound(symbol.to_string()));
        }

        Ok(Quote {
            symbol: payload.symbol.unwrap_or_else(|| symbol.to_string()),
            open: parse_number(payload.open, "open")?,
            high: parse_number(payload.high, "high")?,
            low: parse_number(payload.low, "low")?,
            price: parse_number(payload.price, "price")?,
            volume: parse_volume(payload.volume)?,
            latest_trading_day: payload
                .latest_trading_day
                .ok_or_else(|| ProviderError::Malformed("missing latest trading day".into()))?,
            previous_close: parse_number(payload.previous_close, "previous close")?,
            change: parse_number(payload.change, "change")?,
            change_percent: payload
                .change_percent
                .ok_or_else(|| ProviderError::Malformed("missing change percent".into()))?,
        })
    }
}

fn parse_number(value: Option<String>, field: &str) -> Result<f64, ProviderError> {
    let raw = value.ok_or_else(|| ProviderError::Malformed(format!("missing {}", field)))?;
    raw.parse::<f64>()
        .map_err(|_| ProviderError::Malformed(format!("unparsable {}: {}", field, raw)))
}

fn parse_volume(value: Option<String>) -> Result<i64, ProviderError> {
    let raw = value.ok_or_else(|| ProviderError::Malformed("missing volume".into()))?;
    raw.parse::<i64>()
        .map_err(|_| ProviderError::Malformed(format!("unparsable volume: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_BODY: &str = r#"{
        "Global Quote": {
            "01. symbol": "AAPL",
            "02. open": "228.0300",
            "03. high": "230.7200",
            "04. low": "227.2500",
            "05. price": "229.8700",
            "06. volume": "44923941",
            "07. latest trading day": "2025-01-10",
            "08. previous close": "227.5200",
            "09. change": "2.3500",
            "10. change percent": "1.0329%"
        }
    }"#;

    #[test]
    fn test_parse_full_quote() {
        let quote = QuoteClient::parse_response(FULL_BODY, "AAPL").expect("should parse");

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.open, 228.03);
        assert_eq!(quote.high, 230.72);
        assert_eq!(quote.low, 227.25);
        assert_eq!(quote.price, 229.87);
        assert_eq!(quote.volume, 44_923_941);
        assert_eq!(quote.latest_trading_day, "2025-01-10");
        assert_eq!(quote.previous_close, 227.52);
        assert_eq!(quote.change, 2.35);
        assert_eq!(quote.change_percent, "1.0329%");
    }

    #[test]
    fn test_parse_empty_global_quote_is_symbol_not_found() {
        let body = r#"{"Global Quote": {}}"#;
        let result = QuoteClient::parse_response(body, "NOSUCH");

        assert!(matches!(result, Err(ProviderError::SymbolNotFound(s)) if s == "NOSUCH"));
    }

    #[test]
    fn test_parse_missing_envelope_is_symbol_not_found() {
        let body = r#"{}"#;
        let result = QuoteClient::parse_response(body, "NOSUCH");

        assert!(matches!(result, Err(ProviderError::SymbolNotFound(_))));
    }

    #[test]
    fn test_parse_error_message_invalid_call() {
        let body = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#;
        let result = QuoteClient::parse_response(body, "BAD");

        assert!(matches!(result, Err(ProviderError::SymbolNotFound(s)) if s == "BAD"));
    }

    #[test]
    fn test_parse_note_rate_limit() {
        let body = r#"{"Note": "Thank you for using our API! Our standard API call frequency is 5 calls per minute."}"#;
        let result = QuoteClient::parse_response(body, "AAPL");

        assert!(matches!(result, Err(ProviderError::RateLimited)));
    }

    #[test]
    fn test_parse_information_rate_limit() {
        let body = r#"{"Information": "You have exceeded your daily rate limit of 25 requests per day."}"#;
        let result = QuoteClient::parse_response(body, "AAPL");

        assert!(matches!(result, Err(ProviderError::RateLimited)));
    }

    #[test]
    fn test_parse_unparsable_price_is_malformed() {
        let body = r#"{
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "228.0300",
                "03. high": "230.7200",
                "04. low": "227.2500",
                "05. price": "not-a-number",
                "06. volume": "44923941",
                "07. latest trading day": "2025-01-10",
                "08. previous close": "227.5200",
                "09. change": "2.3500",
                "10. change percent": "1.0329%"
            }
        }"#;
        let result = QuoteClient::parse_response(body, "AAPL");

        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_parse_non_json_is_malformed() {
        let result = QuoteClient::parse_response("<html>busy</html>", "AAPL");

        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }
}
