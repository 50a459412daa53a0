/// Authentication utilities
///
/// Secure authentication primitives shared by the API and the worker:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: purpose-typed JWT issuance and validation
/// - [`middleware`]: Axum bearer-token middleware and [`middleware::AuthContext`]
///
/// # Example
///
/// ```no_run
/// use marketbrief_shared::auth::jwt::{create_token, Claims, TokenType};
/// use marketbrief_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
