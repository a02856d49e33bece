/// User model and database operations
///
/// This module provides the User model and the operations the auth flows need:
/// registration, lookups, refresh-token rotation, email verification and
/// password reset.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(64) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     full_name VARCHAR(255),
///     password_hash VARCHAR(255) NOT NULL,
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     avatar_url VARCHAR(512) NOT NULL DEFAULT 'https://placehold.co/200x200',
///     avatar_local_path VARCHAR(512) NOT NULL DEFAULT '',
///     refresh_token_hash CHAR(64),
///     email_verification_token_hash CHAR(64),
///     email_verification_expires_at TIMESTAMPTZ,
///     forgot_password_token_hash CHAR(64),
///     forgot_password_expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Usernames and emails are normalized to lowercase before they reach the
/// database, so lookups are case-insensitive.
///
/// # Example
///
/// ```no_run
/// use basecampy_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     full_name: Some("Alice".to_string()),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ALICE@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Avatar shown until the user uploads one
pub const DEFAULT_AVATAR_URL: &str = "https://placehold.co/200x200";

/// User model representing a user account
///
/// Holds credentials and token digests, so it is never serialized directly.
/// Use [`User::profile`] or [`UserSummary`] for responses.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Lowercase username, unique across all users
    pub username: String,

    /// Lowercase email address, unique across all users
    pub email: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    /// Whether the email address has been verified
    pub email_verified: bool,

    /// Public avatar URL
    pub avatar_url: String,

    /// Where the avatar lives in local storage (empty for the default avatar)
    pub avatar_local_path: String,

    /// SHA-256 digest of the one active refresh token
    pub refresh_token_hash: Option<String>,

    /// SHA-256 digest of the pending email verification token
    pub email_verification_token_hash: Option<String>,

    /// When the pending email verification token stops being accepted
    pub email_verification_expires_at: Option<DateTime<Utc>>,

    /// SHA-256 digest of the pending password reset token
    pub forgot_password_token_hash: Option<String>,

    /// When the pending password reset token stops being accepted
    pub forgot_password_expires_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Avatar reference returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub url: String,
    pub local_path: String,
}

/// Sanitized user returned by the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub email_verified: bool,
    pub avatar: Avatar,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public fields of a user embedded in other resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: String,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Username (normalized to lowercase)
    pub username: String,

    /// Email address (normalized to lowercase)
    pub email: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

/// Normalizes usernames and emails for storage and lookup
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

impl User {
    /// Returns the sanitized view of this user
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            email_verified: self.email_verified,
            avatar: self.avatar(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Returns the avatar reference
    pub fn avatar(&self) -> Avatar {
        Avatar {
            url: self.avatar_url.clone(),
            local_path: self.avatar_local_path.clone(),
        }
    }

    /// Returns the public summary of this user
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username or email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, full_name, password_hash, email_verified,
                      avatar_url, avatar_local_path, refresh_token_hash,
                      email_verification_token_hash, email_verification_expires_at,
                      forgot_password_token_hash, forgot_password_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(normalize_identifier(&data.username))
        .bind(normalize_identifier(&data.email))
        .bind(data.full_name)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, email_verified,
                   avatar_url, avatar_local_path, refresh_token_hash,
                   email_verification_token_hash, email_verification_expires_at,
                   forgot_password_token_hash, forgot_password_expires_at,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, email_verified,
                   avatar_url, avatar_local_path, refresh_token_hash,
                   email_verification_token_hash, email_verification_expires_at,
                   forgot_password_token_hash, forgot_password_expires_at,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_identifier(email))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Checks whether either the username or the email is already taken
    pub async fn exists_by_username_or_email(
        pool: &PgPool,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE username = $1 OR email = $2
            )
            "#,
        )
        .bind(normalize_identifier(username))
        .bind(normalize_identifier(email))
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Loads the public summaries of a set of users
    pub async fn summaries_by_ids(
        pool: &PgPool,
        ids: &[Uuid],
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let summaries = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, full_name, avatar_url
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(summaries)
    }

    /// Replaces (or clears, with `None`) the stored refresh token digest
    ///
    /// # Returns
    ///
    /// True if the user exists
    pub async fn set_refresh_token_hash(
        pool: &PgPool,
        id: Uuid,
        refresh_token_hash: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(refresh_token_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a pending email verification token digest
    pub async fn set_email_verification_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verification_token_hash = $2,
                email_verification_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes an email verification token
    ///
    /// Marks the matching user verified and clears the token in one statement,
    /// so a token can be used at most once.
    ///
    /// # Returns
    ///
    /// The verified user, or None if no unexpired token matches
    pub async fn verify_email(pool: &PgPool, token_hash: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email_verified = TRUE,
                email_verification_token_hash = NULL,
                email_verification_expires_at = NULL,
                updated_at = NOW()
            WHERE email_verification_token_hash = $1
              AND email_verification_expires_at > NOW()
            RETURNING id, username, email, full_name, password_hash, email_verified,
                      avatar_url, avatar_local_path, refresh_token_hash,
                      email_verification_token_hash, email_verification_expires_at,
                      forgot_password_token_hash, forgot_password_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Stores a pending password reset token digest
    pub async fn set_forgot_password_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET forgot_password_token_hash = $2,
                forgot_password_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes a password reset token and installs a new password hash
    ///
    /// # Returns
    ///
    /// The updated user, or None if no unexpired token matches
    pub async fn reset_password(
        pool: &PgPool,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                forgot_password_token_hash = NULL,
                forgot_password_expires_at = NULL,
                updated_at = NOW()
            WHERE forgot_password_token_hash = $1
              AND forgot_password_expires_at > NOW()
            RETURNING id, username, email, full_name, password_hash, email_verified,
                      avatar_url, avatar_local_path, refresh_token_hash,
                      email_verification_token_hash, email_verification_expires_at,
                      forgot_password_token_hash, forgot_password_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(token_hash)
        .bind(password_hash)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the avatar reference
    ///
    /// # Returns
    ///
    /// The updated user if found, None otherwise
    pub async fn update_avatar(
        pool: &PgPool,
        id: Uuid,
        avatar: &Avatar,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET avatar_url = $2, avatar_local_path = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, full_name, password_hash, email_verified,
                      avatar_url, avatar_local_path, refresh_token_hash,
                      email_verification_token_hash, email_verification_expires_at,
                      forgot_password_token_hash, forgot_password_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&avatar.url)
        .bind(&avatar.local_path)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: Some("Alice".to_string()),
            password_hash: "$argon2id$secret".to_string(),
            email_verified: false,
            avatar_url: DEFAULT_AVATAR_URL.to_string(),
            avatar_local_path: String::new(),
            refresh_token_hash: Some("a".repeat(64)),
            email_verification_token_hash: Some("b".repeat(64)),
            email_verification_expires_at: Some(now),
            forgot_password_token_hash: None,
            forgot_password_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_identifier("bob"), "bob");
    }

    #[test]
    fn test_profile_hides_secrets() {
        let user = sample_user();
        let json = serde_json::to_value(user.profile()).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["avatar"]["url"], DEFAULT_AVATAR_URL);
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token_hash").is_none());
        assert!(json.get("email_verification_token_hash").is_none());
    }

    #[test]
    fn test_summary_fields() {
        let user = sample_user();
        let summary = user.summary();

        assert_eq!(summary.id, user.id);
        assert_eq!(summary.username, "alice");
        assert_eq!(summary.full_name.as_deref(), Some("Alice"));
    }
}
