/// Persisted AI sales analyses
///
/// # Schema
///
/// ```sql
/// CREATE TABLE analyses (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A generated analysis
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    /// Stores an analysis
    pub async fn create(pool: &PgPool, user_id: Uuid, content: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Analysis>(
            r#"
            INSERT INTO analyses (user_id, content)
            VALUES ($1, $2)
            RETURNING id, user_id, content, created_at
            "#,
        )
        .bind(user_id)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    /// Lists a user's analyses, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Analysis>(
            r#"
            SELECT id, user_id, content, created_at
            FROM analyses
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Counts a user's analyses created since `since`
    pub async fn count_since(
        pool: &PgPool,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM analyses WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}
