/// User accounts
///
/// A user owns a portfolio, a per-user quote cache, a quote-provider API
/// key, and the settings for the daily summary email. Passwords are stored
/// as Argon2id hashes, never in plaintext.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     provider_api_key VARCHAR(128),
///     provider_key_updated_at TIMESTAMPTZ,
///     reminder_time VARCHAR(5),
///     reminder_enabled BOOLEAN NOT NULL DEFAULT FALSE,
///     timezone VARCHAR(64) NOT NULL DEFAULT 'UTC',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Column list shared by every query that reads a whole user row.
/// Must stay in sync with the `User` struct fields.
const USER_COLUMNS: &str = "id, email, email_verified, password_hash, name, \
     provider_api_key, provider_key_updated_at, reminder_time, reminder_enabled, \
     timezone, created_at, updated_at, last_login_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique, case-insensitive via CITEXT
    pub email: String,

    /// Flipped to true once by the verification flow
    pub email_verified: bool,

    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Key presented to the quote provider for this user's fetches
    pub provider_api_key: Option<String>,

    /// Last key rotation; rotation frequency is throttled off this
    pub provider_key_updated_at: Option<DateTime<Utc>>,

    /// Local wall-clock "HH:MM" for the daily summary email, None until
    /// a reminder has been configured
    pub reminder_time: Option<String>,

    pub reminder_enabled: bool,

    /// IANA zone name the reminder time is interpreted in, "UTC" default
    pub timezone: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// None until the first successful login
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for registering a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id hash, hashed before this struct is built
    pub password_hash: String,

    pub name: Option<String>,

    /// Required at registration; rotated later through
    /// [`User::set_provider_key`]
    pub provider_api_key: String,
}

/// Partial update; None fields are left untouched
///
/// Double-Option fields distinguish "leave alone" (None) from "clear the
/// column" (Some(None)).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub password_hash: Option<String>,
    pub name: Option<Option<String>>,
    pub email_verified: Option<bool>,
    pub reminder_time: Option<Option<String>>,
    pub reminder_enabled: Option<bool>,
    pub timezone: Option<String>,
}

impl User {
    /// Inserts a new, unverified user
    ///
    /// # Errors
    ///
    /// Returns a database error on duplicate email (unique constraint) or
    /// connection failure. Callers translate the constraint violation into
    /// their own conflict error.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, provider_api_key)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.name)
        .bind(data.provider_api_key)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive email lookup (CITEXT column)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Applies the non-None fields of `data` and bumps `updated_at`
    ///
    /// Returns None when no user has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Two phases: collect the columns being set, then bind values in
        // the same order. $1 is the id, so value binds start at $2.
        let mut columns: Vec<&str> = Vec::new();
        if data.password_hash.is_some() {
            columns.push("password_hash");
        }
        if data.name.is_some() {
            columns.push("name");
        }
        if data.email_verified.is_some() {
            columns.push("email_verified");
        }
        if data.reminder_time.is_some() {
            columns.push("reminder_time");
        }
        if data.reminder_enabled.is_some() {
            columns.push("reminder_enabled");
        }
        if data.timezone.is_some() {
            columns.push("timezone");
        }

        let mut sql = String::from("UPDATE users SET updated_at = NOW()");
        for (i, column) in columns.iter().enumerate() {
            sql.push_str(&format!(", {} = ${}", column, i + 2));
        }
        sql.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut query = sqlx::query_as::<_, User>(&sql).bind(id);
        if let Some(password_hash) = data.password_hash {
            query = query.bind(password_hash);
        }
        if let Some(name) = data.name {
            query = query.bind(name);
        }
        if let Some(verified) = data.email_verified {
            query = query.bind(verified);
        }
        if let Some(time) = data.reminder_time {
            query = query.bind(time);
        }
        if let Some(enabled) = data.reminder_enabled {
            query = query.bind(enabled);
        }
        if let Some(timezone) = data.timezone {
            query = query.bind(timezone);
        }

        query.fetch_optional(pool).await
    }

    /// Replaces the provider API key and records the rotation instant
    ///
    /// The API reads `provider_key_updated_at` back to throttle rotations.
    /// Returns None when no user has this id.
    pub async fn set_provider_key(
        pool: &PgPool,
        id: Uuid,
        key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET provider_api_key = $2,
                provider_key_updated_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Stamps `last_login_at`, called after successful authentication
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The directory the reminder worker walks every tick
    ///
    /// Enabled users without a configured time are excluded; the dispatch
    /// loop would have nothing to match them against.
    pub async fn list_reminder_enabled(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE reminder_enabled = TRUE
              AND reminder_time IS NOT NULL
            ORDER BY created_at
            "#,
        ))
        .fetch_all(pool)
        .await
    }

    /// Removes the account; portfolio entries and cached quotes go with it
    /// via ON DELETE CASCADE
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
