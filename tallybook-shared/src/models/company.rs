/// Company model and database operations
///
/// A company is the tenant boundary: every sale, transaction, ad spend and
/// chat message belongs to exactly one. A user reaches a company either by
/// owning it (`companies.user_id`) or by having it as primary company
/// (`users.company_id`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(120) NOT NULL,
///     slug VARCHAR(50) NOT NULL UNIQUE,
///     sector VARCHAR(120),
///     description TEXT,
///     currency VARCHAR(10) NOT NULL DEFAULT 'BRL',
///     timezone VARCHAR(80) NOT NULL DEFAULT 'America/Sao_Paulo',
///     user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Default currency for new companies
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Default timezone for new companies
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

const COMPANY_COLUMNS: &str = "id, name, slug, sector, description, currency, timezone, user_id, created_at, updated_at";

/// Company (tenant)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,

    /// URL-safe unique identifier, `^[a-z0-9-]+$`
    pub slug: String,

    pub sector: Option<String>,
    pub description: Option<String>,
    pub currency: String,
    pub timezone: String,

    /// Owning user, cleared when that user deletes their account
    pub user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new company
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub slug: String,
    pub sector: Option<String>,
    pub description: Option<String>,

    /// Falls back to [`DEFAULT_CURRENCY`]
    pub currency: Option<String>,

    /// Falls back to [`DEFAULT_TIMEZONE`]
    pub timezone: Option<String>,

    pub owner_id: Option<Uuid>,
}

impl Company {
    /// Creates a new company
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `companies_slug_key` if the slug is taken
    pub async fn create<'e, E>(executor: E, data: CreateCompany) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (name, slug, sector, description, currency, timezone, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(data.name.trim())
        .bind(data.slug)
        .bind(data.sector)
        .bind(data.description)
        .bind(data.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
        .bind(data.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()))
        .bind(data.owner_id)
        .fetch_one(executor)
        .await?;

        Ok(company)
    }

    /// Finds a company by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a company by slug
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// Returns true if the slug is already taken
    pub async fn slug_exists(pool: &PgPool, slug: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM companies WHERE slug = $1)")
                .bind(slug)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Lists companies the user owns or has as primary company, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            r#"
            SELECT {COMPANY_COLUMNS}
            FROM companies
            WHERE user_id = $1
               OR id = (SELECT company_id FROM users WHERE id = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Counts companies the user owns or has as primary company
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM companies
            WHERE user_id = $1
               OR id = (SELECT company_id FROM users WHERE id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Returns true if the user owns the company or has it as primary company
    pub async fn user_has_access(
        pool: &PgPool,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let (allowed,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM companies WHERE id = $1 AND user_id = $2
                UNION ALL
                SELECT 1 FROM users WHERE id = $2 AND company_id = $1
            )
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(allowed)
    }

    /// Clears the owner on every company the user owns
    pub async fn detach_owner<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE companies SET user_id = NULL, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_company_defaults_are_empty() {
        let data = CreateCompany {
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            ..Default::default()
        };

        assert!(data.currency.is_none());
        assert!(data.timezone.is_none());
        assert!(data.owner_id.is_none());
    }

    #[test]
    fn test_company_serializes_camel_case() {
        let company = Company {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            sector: None,
            description: None,
            currency: DEFAULT_CURRENCY.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&company).unwrap();
        assert_eq!(value["currency"], "BRL");
        assert_eq!(value["timezone"], "America/Sao_Paulo");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("userId").is_some());
    }
}
