/// User model and database operations
///
/// A user authenticates with email and password and works inside one primary
/// company (`company_id`). Emails are stored lowercased and trimmed, see
/// [`normalize_email`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(120),
///     detail_level VARCHAR(10) NOT NULL DEFAULT 'medium',
///     plan VARCHAR(10) NOT NULL DEFAULT 'free',
///     company_id UUID REFERENCES companies(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tallybook_shared::models::user::{User, CreateUser};
/// use tallybook_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "owner@acme.test".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Administrador".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "Owner@Acme.test ").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, name, detail_level, plan, company_id, created_at, updated_at";

/// How verbose AI answers should be for this user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Low,
    Medium,
    High,
}

impl DetailLevel {
    /// Converts detail level to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::Medium => "medium",
            DetailLevel::High => "high",
        }
    }

    /// Parses detail level from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(DetailLevel::Low),
            "medium" => Some(DetailLevel::Medium),
            "high" => Some(DetailLevel::High),
            _ => None,
        }
    }

    /// Parses a stored value, treating anything unknown as `Medium`
    pub fn normalize(s: Option<&str>) -> Self {
        s.and_then(Self::from_str).unwrap_or(DetailLevel::Medium)
    }
}

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserPlan {
    /// Limited number of AI analyses per month
    Free,

    /// No analysis limit
    Pro,
}

impl UserPlan {
    /// Converts plan to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserPlan::Free => "free",
            UserPlan::Pro => "pro",
        }
    }

    /// Parses plan from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(UserPlan::Free),
            "pro" => Some(UserPlan::Pro),
            _ => None,
        }
    }
}

/// Lowercases and trims an email address
///
/// Every write and every lookup goes through this so that the unique index on
/// `users.email` is effectively case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User model representing a user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, lowercased and trimmed
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub name: Option<String>,

    /// AI answer verbosity (`low` | `medium` | `high`)
    pub detail_level: String,

    /// Subscription plan (`free` | `pro`)
    pub plan: String,

    /// Primary company
    pub company_id: Option<Uuid>,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Gets the parsed detail level, defaulting to `Medium`
    pub fn get_detail_level(&self) -> DetailLevel {
        DetailLevel::normalize(Some(&self.detail_level))
    }

    /// Gets the parsed plan
    pub fn get_plan(&self) -> Option<UserPlan> {
        UserPlan::from_str(&self.plan)
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (normalized on insert)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Display name
    pub name: String,
}

/// Profile fields a user may change about themselves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    /// New display name
    pub name: Option<String>,

    /// New detail level
    pub detail_level: Option<DetailLevel>,
}

/// Public view of a user returned by profile endpoints
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub detail_level: String,
    pub company_id: Option<Uuid>,
}

impl User {
    /// Creates a new user
    ///
    /// Accepts any executor so registration can run it inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `users_email_key` if the email exists
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .bind(data.name)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// The input is normalized before the lookup.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tallybook_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_email(&pool, " ADMIN@empresa-demo.com").await? {
    ///     println!("Found user: {}", user.id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Returns true if an account with this email exists
    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(normalize_email(email))
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Loads the public profile fields
    pub async fn profile(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, email, name, detail_level, company_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Updates name and/or detail level
    ///
    /// Fields left as `None` keep their current value.
    ///
    /// # Returns
    ///
    /// The updated profile, or None if the user doesn't exist
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                detail_level = COALESCE($3, detail_level),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, detail_level, company_id
            "#,
        )
        .bind(id)
        .bind(data.name.map(|n| n.trim().to_string()))
        .bind(data.detail_level.map(|d| d.as_str()))
        .fetch_optional(pool)
        .await
    }

    /// Replaces the stored password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Points the user at a primary company
    pub async fn set_company<'e, E>(
        executor: E,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE users SET company_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(company_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user by ID
    ///
    /// Refresh tokens, chat messages and analyses cascade. Sales and
    /// transactions keep their rows with `user_id` set to NULL.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
