/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>` which automatically
/// converts to appropriate HTTP status codes.
///
/// Provider failures get their own upstream statuses (404/429/502/504)
/// so clients can tell an unknown ticker from a throttled API key from a
/// slow provider.
///
/// # Example
///
/// ```
/// use marketbrief_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Ok(Json(json!({ "status": "ok" })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marketbrief_shared::{
    auth::{jwt::JwtError, middleware::AuthError, password::PasswordError},
    mailer::MailerError,
    quotes::ProviderError,
    reminders::ReminderError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403) - e.g., unverified email at login
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., symbol already in portfolio
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Too many requests (429)
    ///
    /// `retry_after` is emitted as a Retry-After header when known. The
    /// quote provider does not report one; the key-rotation throttle does.
    RateLimited {
        retry_after: Option<u64>,
        message: String,
    },

    /// Internal server error (500)
    InternalError(String),

    /// Bad gateway (502) - provider or mail relay failure
    BadGateway(String),

    /// Gateway timeout (504) - provider did not answer in time
    GatewayTimeout(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RateLimited { message, .. } => write!(f, "Rate limited: {}", message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::BadGateway(msg) => write!(f, "Bad gateway: {}", msg),
            ApiError::GatewayTimeout(msg) => write!(f, "Gateway timeout: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Handle rate limit separately to add Retry-After header
        if let ApiError::RateLimited {
            retry_after,
            message,
        } = &self
        {
            let body = Json(ErrorResponse {
                error: "rate_limited".to_string(),
                message: message.clone(),
                details: None,
            });

            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            if let Some(seconds) = retry_after {
                if let Ok(value) = axum::http::HeaderValue::from_str(&seconds.to_string()) {
                    response.headers_mut().insert("Retry-After", value);
                }
            }
            return response;
        }

        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::RateLimited { message, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                message,
                None,
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg, None),
            ApiError::GatewayTimeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
///
/// Unique and foreign-key violations are recognized by constraint name so
/// races against the pre-checks in the handlers still produce the right
/// status.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("User already exists".to_string());
                    }
                    if constraint.contains("portfolio_entries_symbol") {
                        return ApiError::NotFound("Stock not found".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert quote-provider errors to API errors
impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::SymbolNotFound(symbol) => {
                ApiError::NotFound(format!("Stock symbol '{}' not found", symbol))
            }
            ProviderError::RateLimited => ApiError::RateLimited {
                retry_after: None,
                message: "Quote provider rate limit exceeded".to_string(),
            },
            ProviderError::Timeout => {
                ApiError::GatewayTimeout("Quote provider timed out".to_string())
            }
            ProviderError::Malformed(msg) => {
                ApiError::BadGateway(format!("Quote provider returned malformed data: {}", msg))
            }
            ProviderError::Upstream(msg) => {
                ApiError::BadGateway(format!("Quote provider error: {}", msg))
            }
        }
    }
}

/// Convert auth middleware errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert password errors to API errors
///
/// Strength failures carry the rule that was broken; hashing failures
/// stay internal.
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooWeak(msg) => ApiError::BadRequest(msg),
            _ => ApiError::InternalError(format!("Password operation failed: {}", err)),
        }
    }
}

/// Convert reminder-settings errors to API errors
impl From<ReminderError> for ApiError {
    fn from(err: ReminderError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Convert request-validation failures to API errors
///
/// Flattens validator's per-field error map so handlers can call
/// `req.validate()?` directly.
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

/// Convert mail-relay errors to API errors
impl From<MailerError> for ApiError {
    fn from(err: MailerError) -> Self {
        match err {
            MailerError::Timeout => ApiError::GatewayTimeout("Mail relay timed out".to_string()),
            other => ApiError::BadGateway(format!("Failed to send email: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_provider_error_statuses() {
        let err: ApiError = ProviderError::SymbolNotFound("NOPE".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = ProviderError::Timeout.into();
        assert!(matches!(err, ApiError::GatewayTimeout(_)));

        let err: ApiError = ProviderError::RateLimited.into();
        assert!(matches!(err, ApiError::RateLimited { .. }));

        let err: ApiError = ProviderError::Upstream("HTTP 500".to_string()).into();
        assert!(matches!(err, ApiError::BadGateway(_)));
    }

    #[test]
    fn test_validator_errors_flatten_to_details() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(email(message = "Invalid email format"))]
            email: String,
        }

        let probe = Probe {
            email: "not-an-email".to_string(),
        };
        let err: ApiError = probe.validate().unwrap_err().into();

        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[0].message, "Invalid email format");
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_weak_password_is_bad_request() {
        let err: ApiError =
            PasswordError::TooWeak("Password must contain at least one digit".to_string()).into();
        match err {
            ApiError::BadRequest(msg) => {
                assert_eq!(msg, "Password must contain at least one digit")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }
}
