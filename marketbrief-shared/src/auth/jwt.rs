/// JWT issuance and validation
///
/// All tokens are HS256-signed and carry a typed purpose claim, so a
/// token minted for one flow can never be replayed into another: the
/// password-reset endpoint only accepts `password_reset` tokens, the
/// auth middleware only accepts `access` tokens, and so on.
///
/// # Token purposes
///
/// - `access` (24 h) authenticates API requests
/// - `refresh` (30 d) mints new access tokens
/// - `email_verification` (24 h) backs the link in the signup email
/// - `password_reset` (1 h) backs the link in the reset email
/// - `account_deletion` (30 min) confirms the two-step account delete
///
/// # Example
///
/// ```
/// use marketbrief_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let claims = Claims::new(user_id, TokenType::Access);
/// let token = create_token(&claims, "a-32-byte-minimum-signing-secret!")?;
///
/// let validated = validate_token(&token, "a-32-byte-minimum-signing-secret!")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "marketbrief";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token carries a different purpose than the endpoint accepts
    #[error("Expected {expected} token, got {actual} token")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token purpose identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// API authentication (24 hours)
    Access,

    /// Access-token renewal (30 days)
    Refresh,

    /// Email verification link (24 hours)
    EmailVerification,

    /// Password reset link (1 hour)
    PasswordReset,

    /// Account deletion confirmation link (30 minutes)
    AccountDeletion,
}

impl TokenType {
    /// Default lifetime for this purpose
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
            TokenType::EmailVerification => Duration::hours(24),
            TokenType::PasswordReset => Duration::hours(1),
            TokenType::AccountDeletion => Duration::minutes(30),
        }
    }

    /// Purpose name as it appears in the claim
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::EmailVerification => "email_verification",
            TokenType::PasswordReset => "password_reset",
            TokenType::AccountDeletion => "account_deletion",
        }
    }
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus the typed
/// `token_type` purpose claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user id
    pub sub: Uuid,

    /// Issuer, always "marketbrief"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token purpose
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims with the purpose's default lifetime
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, token_type, token_type.default_expiration())
    }

    /// Creates claims with an explicit lifetime
    pub fn with_expiration(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Checks whether the token is past its expiration
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Remaining lifetime, or `None` once expired
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Signs claims into a token string
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiration, nbf, and issuer
///
/// # Errors
///
/// Returns `JwtError::Expired` for expired tokens, `InvalidIssuer` for a
/// foreign issuer, and `ValidationError` for everything else.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates a token and requires a specific purpose
///
/// Single-purpose link tokens (verification, reset, deletion) go through
/// here so a leaked token of one kind cannot drive another flow.
///
/// # Errors
///
/// Returns `JwtError::WrongTokenType` when the purpose claim differs.
pub fn validate_token_of_type(
    token: &str,
    secret: &str,
    expected: TokenType,
) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates a token and requires the `access` purpose
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_token_of_type(token, secret, TokenType::Access)
}

/// Validates a token and requires the `refresh` purpose
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_token_of_type(token, secret, TokenType::Refresh)
}

/// Mints a new access token from a valid refresh token
///
/// # Errors
///
/// Returns an error if the refresh token is invalid, expired, or not a
/// refresh token.
pub fn refresh_access_token(refresh_token: &str, secret: &str) -> Result<String, JwtError> {
    let refresh_claims = validate_refresh_token(refresh_token, secret)?;

    let access_claims = Claims::new(refresh_claims.sub, TokenType::Access);
    create_token(&access_claims, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_default_expirations() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(30));
        assert_eq!(
            TokenType::EmailVerification.default_expiration(),
            Duration::hours(24)
        );
        assert_eq!(
            TokenType::PasswordReset.default_expiration(),
            Duration::hours(1)
        );
        assert_eq!(
            TokenType::AccountDeletion.default_expiration(),
            Duration::minutes(30)
        );
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, TokenType::Access);

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "marketbrief");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_claims_with_custom_expiration() {
        let claims =
            Claims::with_expiration(Uuid::new_v4(), TokenType::Access, Duration::hours(1));

        let time_left = claims.time_until_expiration().unwrap();
        assert!(time_left.num_seconds() > 3500);
        assert!(time_left.num_seconds() <= 3600);
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.token_type, TokenType::Access);
        assert_eq!(validated.iss, "marketbrief");
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Should create token");

        assert!(validate_token(&token, "some-other-secret").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            TokenType::Access,
            Duration::seconds(-3600),
        );

        assert!(claims.is_expired());
        assert!(claims.time_until_expiration().is_none());

        let token = create_token(&claims, SECRET).expect("Should create token");
        let result = validate_token(&token, SECRET);

        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_access_validator_rejects_other_purposes() {
        let access = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();
        assert!(validate_access_token(&access, SECRET).is_ok());

        for other in [
            TokenType::Refresh,
            TokenType::EmailVerification,
            TokenType::PasswordReset,
            TokenType::AccountDeletion,
        ] {
            let token = create_token(&Claims::new(Uuid::new_v4(), other), SECRET).unwrap();
            let result = validate_access_token(&token, SECRET);
            assert!(
                matches!(result, Err(JwtError::WrongTokenType { .. })),
                "{} token should be rejected as access",
                other.as_str()
            );
        }
    }

    #[test]
    fn test_purpose_validator_requires_exact_type() {
        let reset =
            create_token(&Claims::new(Uuid::new_v4(), TokenType::PasswordReset), SECRET).unwrap();

        assert!(validate_token_of_type(&reset, SECRET, TokenType::PasswordReset).is_ok());

        let result = validate_token_of_type(&reset, SECRET, TokenType::AccountDeletion);
        assert!(matches!(
            result,
            Err(JwtError::WrongTokenType {
                expected: "account_deletion",
                actual: "password_reset",
            })
        ));
    }

    #[test]
    fn test_refresh_access_token() {
        let user_id = Uuid::new_v4();
        let refresh =
            create_token(&Claims::new(user_id, TokenType::Refresh), SECRET).unwrap();

        let new_access = refresh_access_token(&refresh, SECRET).unwrap();

        let validated = validate_access_token(&new_access, SECRET).unwrap();
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_with_access_token_fails() {
        let access = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();

        assert!(refresh_access_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_purpose_claim_serializes_snake_case() {
        let claims = Claims::new(Uuid::new_v4(), TokenType::EmailVerification);
        let json = serde_json::to_string(&claims).unwrap();

        assert!(json.contains("\"token_type\":\"email_verification\""));
    }
}
