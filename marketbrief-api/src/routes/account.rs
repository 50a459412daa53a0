/// Account settings and lifecycle endpoints
///
/// Profile, provider-key rotation, daily-reminder settings, on-demand
/// summary mail, and the two-step account deletion. Everything except
/// the deletion confirmation requires JWT authentication; confirmation
/// arrives from a mailed link carrying a purpose-typed token.
///
/// # Endpoints
///
/// - `GET    /v1/account/profile` - Profile with masked provider key
/// - `PUT    /v1/account/api-key` - Rotate provider key (weekly throttle)
/// - `GET    /v1/account/reminder` - Current reminder settings
/// - `PUT    /v1/account/reminder` - Update reminder settings
/// - `POST   /v1/account/summary/send` - Email the digest right now
/// - `DELETE /v1/account` - Send the deletion-confirmation email
/// - `DELETE /v1/account/confirm` - Finalize deletion with the token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{auth::TokenQuery, MessageResponse},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use marketbrief_shared::{
    auth::{jwt, middleware::AuthContext},
    models::user::{UpdateUser, User},
    reminders::{normalize_reminder_time, resolve_timezone},
    summary::compose_summary,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Minimum wait between provider-key rotations
const KEY_ROTATION_INTERVAL_DAYS: i64 = 7;

/// Profile response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// Email address
    pub email: String,

    /// Whether the email address is verified
    pub email_verified: bool,

    /// Display name
    pub name: Option<String>,

    /// Masked provider API key (last four characters visible)
    pub provider_api_key: Option<String>,

    /// When the provider key was last rotated
    pub provider_key_updated_at: Option<DateTime<Utc>>,

    /// Whether the daily summary email is enabled
    pub reminder_enabled: bool,

    /// Local wall-clock send time, "HH:MM"
    pub reminder_time: Option<String>,

    /// IANA timezone the reminder time is interpreted in
    pub timezone: String,
}

/// Provider-key rotation request
#[derive(Debug, Deserialize, Validate)]
pub struct RotateKeyRequest {
    /// Replacement provider API key
    #[validate(length(min = 1, max = 128, message = "API key must be 1-128 characters"))]
    pub new_api_key: String,
}

/// Reminder settings, as stored
#[derive(Debug, Serialize)]
pub struct ReminderSettingsResponse {
    /// Whether the daily summary email is enabled
    pub reminder_enabled: bool,

    /// Local wall-clock send time, "HH:MM"
    pub reminder_time: Option<String>,

    /// IANA timezone the reminder time is interpreted in
    pub timezone: String,
}

/// Reminder settings update request
#[derive(Debug, Deserialize)]
pub struct UpdateReminderRequest {
    /// Enable or disable the daily summary email
    pub enabled: bool,

    /// Local wall-clock send time, "HH:MM" (required to start sending;
    /// ignored when disabling)
    pub reminder_time: Option<String>,

    /// IANA timezone name (defaults to UTC when omitted)
    pub timezone: Option<String>,
}

/// Reminder settings update response, echoing the stored values
#[derive(Debug, Serialize)]
pub struct UpdateReminderResponse {
    /// Outcome description
    pub message: String,

    /// Whether the daily summary email is now enabled
    pub enabled: bool,

    /// Stored send time after normalization
    pub reminder_time: Option<String>,

    /// Stored timezone
    pub timezone: String,
}

/// Send-summary response
#[derive(Debug, Serialize)]
pub struct SendSummaryResponse {
    /// Outcome description
    pub message: String,

    /// Number of portfolio rows in the digest
    pub stocks_included: usize,

    /// Address the digest was sent to
    pub recipient: String,
}

/// Get profile
///
/// The provider key is masked down to its last four characters; the
/// full key is never returned after registration.
///
/// # Endpoint
///
/// ```text
/// GET /v1/account/profile
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = find_user(&state, auth.user_id).await?;

    Ok(Json(ProfileResponse {
        email: user.email,
        email_verified: user.email_verified,
        name: user.name,
        provider_api_key: user.provider_api_key.as_deref().map(mask_provider_key),
        provider_key_updated_at: user.provider_key_updated_at,
        reminder_enabled: user.reminder_enabled,
        reminder_time: user.reminder_time,
        timezone: user.timezone,
    }))
}

/// Rotate the provider API key
///
/// Rotation is throttled to once per week, counted from the previous
/// rotation. The key set at registration does not start the clock.
///
/// # Endpoint
///
/// ```text
/// PUT /v1/account/api-key
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "new_api_key": "NEWKEY123" }
/// ```
///
/// # Errors
///
/// - `429 Too Many Requests`: Rotated within the last 7 days
///   (Retry-After reports the remaining wait in seconds)
/// - `422 Unprocessable Entity`: Validation failed
pub async fn rotate_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RotateKeyRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = find_user(&state, auth.user_id).await?;

    if let Some(rotated_at) = user.provider_key_updated_at {
        let next_allowed = rotated_at + Duration::days(KEY_ROTATION_INTERVAL_DAYS);
        let now = Utc::now();
        if now < next_allowed {
            let retry_after = (next_allowed - now).num_seconds().max(0) as u64;
            return Err(ApiError::RateLimited {
                retry_after: Some(retry_after),
                message: "API key can only be updated once per week".to_string(),
            });
        }
    }

    User::set_provider_key(&state.db, user.id, &req.new_api_key)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Provider API key rotated");

    Ok(Json(MessageResponse::new("API key updated successfully")))
}

/// Get reminder settings
///
/// # Endpoint
///
/// ```text
/// GET /v1/account/reminder
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn reminder_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ReminderSettingsResponse>> {
    let user = find_user(&state, auth.user_id).await?;

    Ok(Json(ReminderSettingsResponse {
        reminder_enabled: user.reminder_enabled,
        reminder_time: user.reminder_time,
        timezone: user.timezone,
    }))
}

/// Update reminder settings
///
/// The time is normalized to zero-padded "HH:MM" ("9:30" becomes
/// "09:30") and the timezone must name a real IANA zone. Disabling
/// clears the stored time; enabling without a time keeps whatever was
/// stored before.
///
/// # Endpoint
///
/// ```text
/// PUT /v1/account/reminder
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "enabled": true,
///   "reminder_time": "09:30",
///   "timezone": "America/New_York"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Bad time format or unknown timezone
pub async fn update_reminder_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateReminderRequest>,
) -> ApiResult<Json<UpdateReminderResponse>> {
    let timezone = req.timezone.unwrap_or_else(|| "UTC".to_string());
    resolve_timezone(&timezone)?;

    let reminder_time = match (req.enabled, req.reminder_time.as_deref()) {
        // Disabling always clears the stored time
        (false, _) => Some(None),
        (true, Some(time)) => Some(Some(normalize_reminder_time(time)?)),
        (true, None) => None,
    };

    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            reminder_enabled: Some(req.enabled),
            reminder_time,
            timezone: Some(timezone),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        enabled = user.reminder_enabled,
        time = user.reminder_time.as_deref().unwrap_or("-"),
        timezone = %user.timezone,
        "Reminder settings updated"
    );

    Ok(Json(UpdateReminderResponse {
        message: "Email reminder settings updated successfully".to_string(),
        enabled: user.reminder_enabled,
        reminder_time: user.reminder_time,
        timezone: user.timezone,
    }))
}

/// Email the digest right now
///
/// Composes the summary from the cache and sends it to the caller's own
/// address, regardless of reminder settings.
///
/// # Endpoint
///
/// ```text
/// POST /v1/account/summary/send
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Portfolio is empty
/// - `502 Bad Gateway`: Mail relay rejected the message
/// - `504 Gateway Timeout`: Mail relay timed out
pub async fn send_summary_now(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<SendSummaryResponse>> {
    let user = find_user(&state, auth.user_id).await?;

    let rows = compose_summary(&state.db, user.id).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound(
            "Portfolio is empty - add some stocks first".to_string(),
        ));
    }

    state
        .mailer
        .send_daily_summary_email(&user.email, &rows)
        .await?;

    Ok(Json(SendSummaryResponse {
        message: "Email sent successfully".to_string(),
        stocks_included: rows.len(),
        recipient: user.email,
    }))
}

/// Initiate account deletion
///
/// Sends a confirmation email with a 30-minute `account_deletion` token.
/// Nothing is deleted until the link is followed.
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/account
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn request_deletion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    let user = find_user(&state, auth.user_id).await?;

    let claims = jwt::Claims::new(user.id, jwt::TokenType::AccountDeletion);
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    state
        .mailer
        .send_account_deletion_email(&user.email, &token)
        .await?;

    tracing::info!(user_id = %user.id, "Account deletion email sent");

    Ok(Json(MessageResponse::new(
        "Account deletion verification email sent. You have 30 minutes to confirm.",
    )))
}

/// Finalize account deletion
///
/// Accepts only `account_deletion` tokens. Deleting cascades to the
/// portfolio and the quote cache.
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/account/confirm?token=eyJ...
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid, expired, or wrong-purpose token
/// - `404 Not Found`: The account no longer exists
pub async fn confirm_deletion(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = jwt::validate_token_of_type(
        &query.token,
        state.jwt_secret(),
        jwt::TokenType::AccountDeletion,
    )
    .map_err(|_| ApiError::BadRequest("Invalid or expired token".to_string()))?;

    let deleted = User::delete(&state.db, claims.sub).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %claims.sub, "Account deleted");

    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

/// Loads the authenticated user, 404 if the account vanished mid-session
async fn find_user(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Masks a provider key down to its last four characters
fn mask_provider_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_provider_key_keeps_last_four() {
        assert_eq!(mask_provider_key("ABCDEFGH1234"), "****1234");
    }

    #[test]
    fn test_mask_provider_key_hides_short_keys() {
        assert_eq!(mask_provider_key("abcd"), "****");
        assert_eq!(mask_provider_key("x"), "****");
        assert_eq!(mask_provider_key(""), "****");
    }
}
