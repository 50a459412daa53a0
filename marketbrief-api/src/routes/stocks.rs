/// Stock catalog search
///
/// Read-only lookup against the imported symbol catalog. Used by the
/// frontend's add-to-portfolio typeahead, so it is public and paginated.
///
/// # Endpoint
///
/// ```text
/// GET /v1/stocks?keywords=app&offset=0&limit=50
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Query, State},
    Json,
};
use marketbrief_shared::models::stock::Stock;
use serde::Deserialize;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

/// Catalog search parameters
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Substring matched against symbol and company name; when absent
    /// the catalog is listed in symbol order
    pub keywords: Option<String>,

    /// Number of entries to skip
    #[serde(default)]
    pub offset: i64,

    /// Maximum number of entries to return (capped at 100)
    pub limit: Option<i64>,
}

/// Search the stock catalog
///
/// Matches case-insensitively on ticker symbol or company name. Only
/// currently listed symbols are returned.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: empty keywords, negative offset, or
///   limit above the cap
pub async fn search_stocks(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Stock>>> {
    let mut problems = Vec::new();

    if let Some(keywords) = &params.keywords {
        if keywords.trim().is_empty() {
            problems.push(ValidationErrorDetail {
                field: "keywords".to_string(),
                message: "keywords must not be empty".to_string(),
            });
        }
    }

    if params.offset < 0 {
        problems.push(ValidationErrorDetail {
            field: "offset".to_string(),
            message: "offset must not be negative".to_string(),
        });
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 || limit > MAX_LIMIT {
        problems.push(ValidationErrorDetail {
            field: "limit".to_string(),
            message: format!("limit must be between 1 and {}", MAX_LIMIT),
        });
    }

    if !problems.is_empty() {
        return Err(ApiError::ValidationError(problems));
    }

    let stocks = match params.keywords.as_deref() {
        Some(keywords) => Stock::search(&state.db, keywords.trim(), limit, params.offset).await?,
        None => Stock::list(&state.db, limit, params.offset).await?,
    };

    Ok(Json(stocks))
}
