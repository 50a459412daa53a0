/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration with email verification
/// - Login (verified accounts only)
/// - Token refresh
/// - Password reset via mailed token
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user, send verification email
/// - `GET  /v1/auth/verify-email` - Verify email from mailed link
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token
/// - `POST /v1/auth/forgot-password` - Request a password-reset email
/// - `POST /v1/auth/reset-password` - Set a new password with a reset token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::MessageResponse,
};
use axum::{
    extract::{Query, State},
    Json,
};
use marketbrief_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, UpdateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Must match `password`
    pub confirm_password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Quote-provider API key used for this user's fetches
    #[validate(length(min = 1, message = "Provider API key is required"))]
    pub provider_api_key: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Token passed back from a mailed link
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Forgot-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    /// Email address to send the reset link to
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Reset-password request
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    /// Purpose-typed reset token from the email link
    pub token: String,

    /// New password (validated for strength)
    pub new_password: String,
}

/// Register a new user
///
/// Creates an unverified account and sends the verification email. The
/// user cannot log in until the mailed link is followed.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP@ss123",
///   "confirm_password": "SecureP@ss123",
///   "name": "Jo Investor",
///   "provider_api_key": "demo"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Passwords don't match, or the email is taken
/// - `422 Unprocessable Entity`: Validation failed
/// - `502 Bad Gateway`: Verification email could not be sent
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    if req.password != req.confirm_password {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e.to_string(),
        }])
    })?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.clone(),
            password_hash,
            name: req.name.clone(),
            provider_api_key: req.provider_api_key.clone(),
        },
    )
    .await?;

    let claims = jwt::Claims::new(user.id, jwt::TokenType::EmailVerification);
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    state
        .mailer
        .send_verification_email(&user.email, &token)
        .await?;

    tracing::info!(user_id = %user.id, "User registered, verification email sent");

    Ok(Json(MessageResponse::new(
        "User created successfully. Please check your email to verify your account.",
    )))
}

/// Verify an email address
///
/// Landing endpoint for the link in the verification email. Accepts only
/// `email_verification` tokens; verifying twice is a no-op.
///
/// # Endpoint
///
/// ```text
/// GET /v1/auth/verify-email?token=eyJ...
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid, expired, or wrong-purpose token
/// - `404 Not Found`: The account no longer exists
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = jwt::validate_token_of_type(
        &query.token,
        state.jwt_secret(),
        jwt::TokenType::EmailVerification,
    )
    .map_err(|_| ApiError::BadRequest("Invalid or expired token".to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Ok(Json(MessageResponse::new("Email already verified")));
    }

    User::update(
        &state.db,
        user.id,
        UpdateUser {
            email_verified: Some(true),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Email verified");

    Ok(Json(MessageResponse::new("Email verified successfully")))
}

/// Login endpoint
///
/// Authenticates a verified user and returns JWT tokens.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user_id": "uuid",
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Email not verified yet
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    // Same message for unknown email and wrong password
    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.email_verified {
        return Err(ApiError::Forbidden("Email not verified".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let access_claims = jwt::Claims::new(user.id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        access_token,
        refresh_token,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Request a password-reset email
///
/// Always answers with the same generic message so the endpoint cannot
/// be used to probe which addresses have accounts. The reset email is
/// only actually sent to verified accounts, and a relay failure is
/// logged rather than surfaced for the same reason.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/forgot-password
/// Content-Type: application/json
///
/// { "email": "user@example.com" }
/// ```
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        if user.email_verified {
            let claims = jwt::Claims::new(user.id, jwt::TokenType::PasswordReset);
            let token = jwt::create_token(&claims, state.jwt_secret())?;

            if let Err(e) = state
                .mailer
                .send_password_reset_email(&user.email, &token)
                .await
            {
                tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
            }
        }
    }

    Ok(Json(MessageResponse::new(
        "If your email is registered and verified, you'll receive password reset instructions.",
    )))
}

/// Set a new password with a reset token
///
/// Accepts only `password_reset` tokens. The new password goes through
/// the same strength rules as registration.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/reset-password
/// Content-Type: application/json
///
/// {
///   "token": "eyJ...",
///   "new_password": "EvenStronger@456"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid, expired, or wrong-purpose token
/// - `404 Not Found`: The account no longer exists
/// - `422 Unprocessable Entity`: New password too weak
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = jwt::validate_token_of_type(
        &req.token,
        state.jwt_secret(),
        jwt::TokenType::PasswordReset,
    )
    .map_err(|_| ApiError::BadRequest("Invalid or expired token".to_string()))?;

    password::validate_password_strength(&req.new_password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "new_password".to_string(),
            message: e.to_string(),
        }])
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let password_hash = password::hash_password(&req.new_password)?;

    User::update(
        &state.db,
        user.id,
        UpdateUser {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Password reset completed");

    Ok(Json(MessageResponse::new("Password reset successfully")))
}
