/// User model and database operations
///
/// Users register with an email, a lowercase username and a password. The
/// table also carries the session and one-time token state: the hash of the
/// current refresh token and the hashes (plus expiry) of the pending email
/// verification and password reset tokens.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     username VARCHAR(64) NOT NULL UNIQUE,
///     full_name VARCHAR(255),
///     avatar_url VARCHAR(512),
///     password_hash VARCHAR(255) NOT NULL,
///     is_email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     refresh_token_hash VARCHAR(64),
///     email_verification_token_hash VARCHAR(64),
///     email_verification_expiry TIMESTAMPTZ,
///     forgot_password_token_hash VARCHAR(64),
///     forgot_password_expiry TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Credential and token columns are never serialized.
///
/// # Example
///
/// ```no_run
/// use projectcamp_shared::models::user::{User, CreateUser};
/// use projectcamp_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     username: "jane".to_string(),
///     full_name: Some("Jane Doe".to_string()),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, username, full_name, avatar_url, password_hash, \
    is_email_verified, refresh_token_hash, email_verification_token_hash, \
    email_verification_expiry, forgot_password_token_hash, forgot_password_expiry, \
    created_at, updated_at";

/// User account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Unique, stored lowercase
    pub email: String,

    /// Unique, stored lowercase
    pub username: String,

    pub full_name: Option<String>,

    pub avatar_url: Option<String>,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub is_email_verified: bool,

    /// SHA-256 of the refresh token issued at the last login or refresh
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,

    #[serde(skip_serializing)]
    pub email_verification_token_hash: Option<String>,

    #[serde(skip_serializing)]
    pub email_verification_expiry: Option<DateTime<Utc>>,

    #[serde(skip_serializing)]
    pub forgot_password_token_hash: Option<String>,

    #[serde(skip_serializing)]
    pub forgot_password_expiry: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Public profile embedded in other resources (assignees, note authors)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

impl UserSummary {
    /// Loads the public profiles of several users keyed by ID
    ///
    /// Unknown IDs are simply absent from the map.
    pub async fn find_many(
        pool: &PgPool,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, UserSummary>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email, full_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    /// New display name (use Some(None) to clear)
    pub full_name: Option<Option<String>>,

    /// New avatar URL (use Some(None) to clear)
    pub avatar_url: Option<Option<String>>,

    pub password_hash: Option<String>,

    pub is_email_verified: Option<bool>,
}

impl User {
    /// Creates a new user
    ///
    /// Email and username are lowercased before insert.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email or username already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, username, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email.trim().to_lowercase())
            .bind(data.username.trim().to_lowercase())
            .bind(data.full_name)
            .bind(data.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use projectcamp_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_id(&pool, user_id).await? {
    ///     println!("Found user: {}", user.email);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// Checks whether the email or the username is already taken
    pub async fn exists_by_email_or_username(
        pool: &PgPool,
        email: &str,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)")
            .bind(email.trim().to_lowercase())
            .bind(username.trim().to_lowercase())
            .fetch_one(pool)
            .await
    }

    /// Updates profile, password or verification state
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always set.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.full_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", full_name = ${}", bind_count));
        }
        if data.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.is_email_verified.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_email_verified = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(full_name) = data.full_name {
            q = q.bind(full_name);
        }
        if let Some(avatar_url) = data.avatar_url {
            q = q.bind(avatar_url);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(verified) = data.is_email_verified {
            q = q.bind(verified);
        }

        q.fetch_optional(pool).await
    }

    /// Stores (or clears, with `None`) the current refresh token hash
    pub async fn set_refresh_token_hash(
        pool: &PgPool,
        id: Uuid,
        hash: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a pending email verification token
    pub async fn set_email_verification_token(
        pool: &PgPool,
        id: Uuid,
        hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verification_token_hash = $2, email_verification_expiry = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks the email as verified for the holder of an unexpired token
    ///
    /// Clears the token so it cannot be used twice.
    ///
    /// # Returns
    ///
    /// The verified user, or None if no user holds an unexpired token with
    /// this hash
    pub async fn verify_email(pool: &PgPool, token_hash: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                email_verification_token_hash = NULL,
                email_verification_expiry = NULL,
                updated_at = NOW()
            WHERE email_verification_token_hash = $1
              AND email_verification_expiry > NOW()
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Stores a pending password reset token
    pub async fn set_forgot_password_token(
        pool: &PgPool,
        id: Uuid,
        hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET forgot_password_token_hash = $2, forgot_password_expiry = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password for the holder of an unexpired reset token
    ///
    /// Clears the reset token and the refresh token hash, ending existing
    /// sessions.
    ///
    /// # Returns
    ///
    /// The user, or None if the token is unknown or expired
    pub async fn reset_password(
        pool: &PgPool,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                forgot_password_token_hash = NULL,
                forgot_password_expiry = NULL,
                refresh_token_hash = NULL,
                updated_at = NOW()
            WHERE forgot_password_token_hash = $1
              AND forgot_password_expiry > NOW()
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .bind(password_hash)
            .fetch_optional(pool)
            .await
    }
}
