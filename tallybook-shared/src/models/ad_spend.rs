/// Advertising spend ingested from ad platforms
///
/// # Schema
///
/// ```sql
/// CREATE TABLE ad_spends (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     amount DOUBLE PRECISION NOT NULL CHECK (amount >= 0),
///     spent_at TIMESTAMPTZ NOT NULL,
///     source VARCHAR(50) NOT NULL,
///     metadata JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// A spend entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdSpend {
    pub id: Uuid,
    pub company_id: Uuid,
    pub amount: f64,
    pub spent_at: DateTime<Utc>,

    /// Platform name, e.g. `meta`
    pub source: String,

    /// Platform payload kept for auditing
    pub metadata: JsonValue,

    pub created_at: DateTime<Utc>,
}

/// Input for recording a spend entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAdSpend {
    pub company_id: Uuid,
    pub amount: f64,
    pub spent_at: DateTime<Utc>,
    pub source: String,
    pub metadata: JsonValue,
}

impl AdSpend {
    /// Records a spend entry
    pub async fn create<'e, E>(executor: E, data: CreateAdSpend) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AdSpend>(
            r#"
            INSERT INTO ad_spends (company_id, amount, spent_at, source, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, company_id, amount, spent_at, source, metadata, created_at
            "#,
        )
        .bind(data.company_id)
        .bind(data.amount)
        .bind(data.spent_at)
        .bind(data.source)
        .bind(data.metadata)
        .fetch_one(executor)
        .await
    }

    /// Lists a company's spend entries with optional bounds on `spent_at`
    pub async fn list_between(
        pool: &PgPool,
        company_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AdSpend>(
            r#"
            SELECT id, company_id, amount, spent_at, source, metadata, created_at
            FROM ad_spends
            WHERE company_id = $1
              AND ($2::timestamptz IS NULL OR spent_at >= $2)
              AND ($3::timestamptz IS NULL OR spent_at <= $3)
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Sums all of a company's spend
    pub async fn sum_all(pool: &PgPool, company_id: Uuid) -> Result<f64, sqlx::Error> {
        let (total,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM ad_spends WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// Counts a company's spend entries
    pub async fn count_for_company(pool: &PgPool, company_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ad_spends WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
