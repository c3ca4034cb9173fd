/// Refresh token records
///
/// Only the SHA-256 hex digest of a refresh token is stored. Rows are never
/// deleted: rotation and logout set `revoked_at`, and lookups only match rows
/// that are neither revoked nor expired. Deleting a user clears `user_id`
/// and keeps the rows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE refresh_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     token_hash CHAR(64) NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     revoked_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Stored refresh token (hash only)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,

    /// `None` once the owning user was deleted
    pub user_id: Option<Uuid>,

    /// Lowercase hex SHA-256 of the raw token
    pub token_hash: String,

    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Returns true if the record can still be exchanged
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }

    /// Stores a new token hash
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, revoked_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    /// Finds a non-revoked, non-expired record for this user and hash
    pub async fn find_active(
        pool: &PgPool,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, expires_at, revoked_at, created_at
            FROM refresh_tokens
            WHERE user_id = $1
              AND token_hash = $2
              AND revoked_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    /// Revokes one record if it is still unrevoked
    ///
    /// # Returns
    ///
    /// True if this call performed the revocation. Two concurrent callers on
    /// the same id get exactly one `true`.
    pub async fn revoke(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Revokes the user's unrevoked record with this hash, if any
    pub async fn revoke_by_hash(
        pool: &PgPool,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE user_id = $1 AND token_hash = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Revokes every unrevoked record of the user
    pub async fn revoke_all_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
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
    use chrono::Duration;

    fn record(expires_in: Duration, revoked: bool) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            token_hash: "0".repeat(64),
            expires_at: Utc::now() + expires_in,
            revoked_at: revoked.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_active() {
        assert!(record(Duration::days(30), false).is_active());
        assert!(!record(Duration::days(30), true).is_active());
        assert!(!record(Duration::seconds(-1), false).is_active());
    }
}
