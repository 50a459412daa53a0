/// Portfolio endpoints
///
/// Manages the authenticated user's tracked symbols and their cached
/// quotes. All endpoints require JWT authentication.
///
/// # Endpoints
///
/// - `GET    /v1/portfolio` - List tracked symbols
/// - `POST   /v1/portfolio` - Track a symbol
/// - `DELETE /v1/portfolio/:symbol` - Stop tracking a symbol
/// - `GET    /v1/portfolio/summary` - Composed summary from the cache
/// - `POST   /v1/portfolio/:symbol/refresh` - Fetch and cache one quote
/// - `POST   /v1/portfolio/refresh` - Refresh every tracked symbol

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::MessageResponse,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use marketbrief_shared::{
    auth::middleware::AuthContext,
    models::{
        portfolio::{PortfolioEntry, PortfolioSymbol},
        quote_cache::QuoteCacheEntry,
        stock::Stock,
        user::User,
    },
    summary::{compose_summary, SummaryRow},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Track-symbol request
#[derive(Debug, Deserialize, Validate)]
pub struct AddStockRequest {
    /// Ticker symbol (case-insensitive; stored uppercase)
    #[validate(length(min = 1, max = 20, message = "Symbol must be 1-20 characters"))]
    pub symbol: String,
}

/// Outcome of one symbol in a bulk refresh
#[derive(Debug, Serialize)]
pub struct RefreshOutcome {
    /// Ticker symbol
    pub symbol: String,

    /// Whether the cache row was updated
    pub refreshed: bool,

    /// Failure description when `refreshed` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bulk refresh response
#[derive(Debug, Serialize)]
pub struct RefreshAllResponse {
    /// Number of symbols whose cache row was updated
    pub refreshed: usize,

    /// Number of symbols that failed
    pub failed: usize,

    /// Per-symbol outcomes, in portfolio order
    pub results: Vec<RefreshOutcome>,
}

/// List tracked symbols
///
/// Returns the user's portfolio with catalog display names, ordered by
/// when each symbol was added.
///
/// # Endpoint
///
/// ```text
/// GET /v1/portfolio
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn list_portfolio(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PortfolioSymbol>>> {
    let symbols = PortfolioEntry::list_for_user(&state.db, auth.user_id).await?;

    Ok(Json(symbols))
}

/// Track a symbol
///
/// Adds a catalog symbol to the user's portfolio. The symbol is
/// uppercased before lookup, so "aapl" and "AAPL" are the same entry.
///
/// # Endpoint
///
/// ```text
/// POST /v1/portfolio
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "symbol": "AAPL" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Symbol is not in the catalog (or delisted)
/// - `409 Conflict`: Symbol already tracked
/// - `422 Unprocessable Entity`: Validation failed
pub async fn add_stock(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddStockRequest>,
) -> ApiResult<Json<PortfolioEntry>> {
    req.validate()?;

    let symbol = req.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "symbol".to_string(),
            message: "Symbol must not be blank".to_string(),
        }]));
    }

    // Delisted symbols can stay in existing portfolios but cannot be added
    let listed = Stock::find_by_symbol(&state.db, &symbol)
        .await?
        .map(|s| s.is_listed)
        .unwrap_or(false);
    if !listed {
        return Err(ApiError::NotFound(format!(
            "Stock symbol '{}' not found",
            symbol
        )));
    }

    let entry = PortfolioEntry::add(&state.db, auth.user_id, &symbol)
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("'{}' is already in your portfolio", symbol)))?;

    tracing::info!(user_id = %auth.user_id, symbol = %symbol, "Symbol added to portfolio");

    Ok(Json(entry))
}

/// Stop tracking a symbol
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/portfolio/:symbol
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Symbol is not in the portfolio
pub async fn remove_stock(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let symbol = symbol.trim().to_uppercase();

    let removed = PortfolioEntry::remove(&state.db, auth.user_id, &symbol).await?;
    if !removed {
        return Err(ApiError::NotFound(format!(
            "'{}' is not in your portfolio",
            symbol
        )));
    }

    tracing::info!(user_id = %auth.user_id, symbol = %symbol, "Symbol removed from portfolio");

    Ok(Json(MessageResponse::new("Stock removed from portfolio")))
}

/// Portfolio summary
///
/// Composes a display row for every tracked symbol from the quote cache.
/// Symbols with no cached quote appear with every market field "N/A";
/// the endpoint never calls the provider.
///
/// # Endpoint
///
/// ```text
/// GET /v1/portfolio/summary
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn portfolio_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<SummaryRow>>> {
    let rows = compose_summary(&state.db, auth.user_id).await?;

    Ok(Json(rows))
}

/// Refresh one symbol's cached quote
///
/// Fetches a fresh GLOBAL_QUOTE with the caller's own provider key and
/// replaces the cache row. On any provider failure the cache is left
/// untouched.
///
/// # Endpoint
///
/// ```text
/// POST /v1/portfolio/:symbol/refresh
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: No provider API key on the account
/// - `404 Not Found`: Symbol not tracked, or unknown to the provider
/// - `429 Too Many Requests`: Provider rate limit
/// - `502 Bad Gateway`: Provider or parse failure
/// - `504 Gateway Timeout`: Provider did not answer in time
pub async fn refresh_symbol(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<QuoteCacheEntry>> {
    let symbol = symbol.trim().to_uppercase();

    let api_key = provider_key_for(&state, auth.user_id).await?;

    if !PortfolioEntry::contains(&state.db, auth.user_id, &symbol).await? {
        return Err(ApiError::NotFound(format!(
            "'{}' is not in your portfolio",
            symbol
        )));
    }

    let quote = state.quotes.fetch_global_quote(&symbol, &api_key).await?;
    let entry = QuoteCacheEntry::upsert(&state.db, auth.user_id, &quote).await?;

    Ok(Json(entry))
}

/// Refresh every tracked symbol
///
/// Fetches all portfolio symbols concurrently. A failure on one symbol
/// is reported in its outcome and does not abort the rest.
///
/// # Endpoint
///
/// ```text
/// POST /v1/portfolio/refresh
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "refreshed": 2,
///   "failed": 1,
///   "results": [
///     { "symbol": "AAPL", "refreshed": true },
///     { "symbol": "MSFT", "refreshed": true },
///     { "symbol": "NOPE", "refreshed": false, "error": "Symbol not found: NOPE" }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: No provider API key on the account
pub async fn refresh_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<RefreshAllResponse>> {
    let api_key = provider_key_for(&state, auth.user_id).await?;

    let portfolio = PortfolioEntry::list_for_user(&state.db, auth.user_id).await?;

    let tasks = portfolio.iter().map(|entry| {
        let symbol = entry.symbol.clone();
        let quotes = &state.quotes;
        let db = &state.db;
        let api_key = api_key.as_str();
        let user_id = auth.user_id;

        async move {
            match quotes.fetch_global_quote(&symbol, api_key).await {
                Ok(quote) => match QuoteCacheEntry::upsert(db, user_id, &quote).await {
                    Ok(_) => RefreshOutcome {
                        symbol,
                        refreshed: true,
                        error: None,
                    },
                    Err(e) => RefreshOutcome {
                        symbol,
                        refreshed: false,
                        error: Some(format!("Cache write failed: {}", e)),
                    },
                },
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Quote refresh failed");
                    RefreshOutcome {
                        symbol,
                        refreshed: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
    });

    let results = futures::future::join_all(tasks).await;
    let refreshed = results.iter().filter(|r| r.refreshed).count();
    let failed = results.len() - refreshed;

    tracing::info!(
        user_id = %auth.user_id,
        refreshed,
        failed,
        "Portfolio refresh completed"
    );

    Ok(Json(RefreshAllResponse {
        refreshed,
        failed,
        results,
    }))
}

/// Loads the caller's provider API key, or fails with the setup hint
async fn provider_key_for(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    user.provider_api_key
        .ok_or_else(|| ApiError::BadRequest("Provider API key not set".to_string()))
}
