/// Credential storage used by the token service
///
/// [`CredentialStore`] is the persistence seam for refresh-token records and
/// for the user snapshot embedded in auth responses. Production uses
/// [`PgCredentialStore`]; unit tests use an in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::refresh_token::RefreshToken;

/// User fields returned next to a token pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub detail_level: String,
    pub company_id: Option<Uuid>,

    /// Empty when the user has no company
    pub company_name: String,
}

/// Persistence operations needed to issue, rotate and revoke tokens
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stores the hash of a freshly issued refresh token
    async fn insert_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    /// Returns the record id of a non-revoked, non-expired token
    async fn find_active_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Uuid>, sqlx::Error>;

    /// Revokes a record only if it is still unrevoked; true if this call won
    async fn revoke_refresh_token(&self, record_id: Uuid) -> Result<bool, sqlx::Error>;

    /// Revokes the user's unrevoked record with this hash
    async fn revoke_refresh_token_by_hash(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<u64, sqlx::Error>;

    /// Revokes all of the user's unrevoked records
    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> Result<u64, sqlx::Error>;

    /// Loads the user snapshot, or None if the user no longer exists
    async fn find_session_user(&self, user_id: Uuid) -> Result<Option<SessionUser>, sqlx::Error>;
}

/// PostgreSQL-backed credential store
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        RefreshToken::create(&self.pool, user_id, token_hash, expires_at).await?;
        Ok(())
    }

    async fn find_active_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let record = RefreshToken::find_active(&self.pool, user_id, token_hash).await?;
        Ok(record.map(|r| r.id))
    }

    async fn revoke_refresh_token(&self, record_id: Uuid) -> Result<bool, sqlx::Error> {
        RefreshToken::revoke(&self.pool, record_id).await
    }

    async fn revoke_refresh_token_by_hash(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<u64, sqlx::Error> {
        RefreshToken::revoke_by_hash(&self.pool, user_id, token_hash).await
    }

    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        RefreshToken::revoke_all_for_user(&self.pool, user_id).await
    }

    async fn find_session_user(&self, user_id: Uuid) -> Result<Option<SessionUser>, sqlx::Error> {
        sqlx::query_as::<_, SessionUser>(
            r#"
            SELECT u.id, u.email, u.name, u.detail_level, u.company_id,
                   COALESCE(c.name, '') AS company_name
            FROM users u
            LEFT JOIN companies c ON c.id = u.company_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
