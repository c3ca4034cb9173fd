/// Token issuance, refresh rotation and revocation
///
/// [`TokenService`] signs access and refresh tokens with separate secrets,
/// persists only the SHA-256 of each refresh token, and makes every refresh
/// token single-use: a successful [`TokenService::refresh`] revokes the
/// presented token through a conditional update before issuing a new pair, so
/// two concurrent refreshes with the same token cannot both succeed.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tallybook_shared::auth::store::PgCredentialStore;
/// use tallybook_shared::auth::tokens::{TokenConfig, TokenService};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, raw_refresh: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let service = TokenService::new(
///     TokenConfig {
///         access_secret: "an-access-secret-of-at-least-32-chars".to_string(),
///         refresh_secret: None,
///         access_expires_in: "15m".to_string(),
///         refresh_expires_in: "30d".to_string(),
///     },
///     Arc::new(PgCredentialStore::new(pool)),
/// );
///
/// let session = service.refresh(Some(raw_refresh)).await?;
/// println!("new access token: {}", session.tokens.access_token);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::{
    create_token, parse_duration, validate_refresh_token, Claims, JwtError, TokenType,
};
use super::store::{CredentialStore, SessionUser};

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Presented refresh token cannot be exchanged
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Signing a new token failed
    #[error("Failed to sign token: {0}")]
    Signing(#[from] JwtError),

    /// Store failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Token settings, usually read from the environment
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access-token signing secret
    pub access_secret: String,

    /// Refresh-token signing secret; None reuses the access secret
    pub refresh_secret: Option<String>,

    /// Access lifetime, e.g. `"15m"`; echoed back as `expires_in`
    pub access_expires_in: String,

    /// Refresh lifetime, e.g. `"30d"`
    pub refresh_expires_in: String,
}

/// Access + refresh token pair
///
/// Serializes each token under both its snake_case and camelCase name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: String,
}

impl Serialize for TokenPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TokenPair", 5)?;
        state.serialize_field("access_token", &self.access_token)?;
        state.serialize_field("accessToken", &self.access_token)?;
        state.serialize_field("refresh_token", &self.refresh_token)?;
        state.serialize_field("refreshToken", &self.refresh_token)?;
        state.serialize_field("expires_in", &self.expires_in)?;
        state.end()
    }
}

/// Token pair plus the user snapshot, as returned by login/register/refresh
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthSession {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: SessionUser,
}

/// Lowercase hex SHA-256 of a raw token
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Issues, rotates and revokes tokens
#[derive(Clone)]
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    access_expires_in: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    store: Arc<dyn CredentialStore>,
}

impl TokenService {
    /// Creates a token service
    ///
    /// Unparseable lifetimes fall back to 15 minutes (access) and 30 days
    /// (refresh).
    pub fn new(config: TokenConfig, store: Arc<dyn CredentialStore>) -> Self {
        let access_ttl = parse_duration(&config.access_expires_in).unwrap_or_else(|| {
            warn!(value = %config.access_expires_in, "Unparseable access token lifetime, using 15m");
            Duration::minutes(15)
        });
        let refresh_ttl = parse_duration(&config.refresh_expires_in).unwrap_or_else(|| {
            warn!(value = %config.refresh_expires_in, "Unparseable refresh token lifetime, using 30d");
            Duration::days(30)
        });

        let refresh_secret = config
            .refresh_secret
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| config.access_secret.clone());

        Self {
            access_secret: config.access_secret,
            refresh_secret,
            access_expires_in: config.access_expires_in,
            access_ttl,
            refresh_ttl,
            store,
        }
    }

    /// Secret used to verify access tokens
    pub fn access_secret(&self) -> &str {
        &self.access_secret
    }

    /// Signs a new pair for the user and stores the refresh-token hash
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` or `TokenError::Database`
    pub async fn issue(&self, user: &SessionUser) -> Result<TokenPair, TokenError> {
        let access_claims = Claims::new(
            user.id,
            &user.email,
            user.company_id,
            TokenType::Access,
            self.access_ttl,
        );
        let access_token = create_token(&access_claims, &self.access_secret)?;

        let refresh_claims = Claims::new(
            user.id,
            &user.email,
            user.company_id,
            TokenType::Refresh,
            self.refresh_ttl,
        );
        let refresh_token = create_token(&refresh_claims, &self.refresh_secret)?;

        let expires_at = Utc::now() + self.refresh_ttl;
        self.store
            .insert_refresh_token(user.id, &hash_token(&refresh_token), expires_at)
            .await?;

        debug!(user_id = %user.id, company_id = ?user.company_id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_expires_in.clone(),
        })
    }

    /// Issues a pair and bundles it with the user snapshot
    pub async fn start_session(&self, user: SessionUser) -> Result<AuthSession, TokenError> {
        let tokens = self.issue(&user).await?;
        Ok(AuthSession { tokens, user })
    }

    /// Exchanges a refresh token for a new pair
    ///
    /// # Errors
    ///
    /// `TokenError::Unauthorized` when the token is missing or blank, fails
    /// verification, is not a refresh token, has no stored active record, was
    /// concurrently consumed, or its user no longer exists
    pub async fn refresh(&self, raw_token: Option<&str>) -> Result<AuthSession, TokenError> {
        let raw = raw_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::Unauthorized("Refresh token ausente"))?;

        let claims = validate_refresh_token(raw, &self.refresh_secret).map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            TokenError::Unauthorized("Refresh token invalido")
        })?;

        let record_id = self
            .store
            .find_active_refresh_token(claims.sub, &hash_token(raw))
            .await?
            .ok_or(TokenError::Unauthorized("Refresh token expirado ou revogado"))?;

        let user = self
            .store
            .find_session_user(claims.sub)
            .await?
            .ok_or(TokenError::Unauthorized("Usuario nao encontrado"))?;

        if !self.store.revoke_refresh_token(record_id).await? {
            warn!(user_id = %claims.sub, "Refresh token consumed concurrently");
            return Err(TokenError::Unauthorized("Refresh token expirado ou revogado"));
        }

        info!(user_id = %user.id, "Refresh token rotated");

        self.start_session(user).await
    }

    /// Revokes refresh tokens on logout
    ///
    /// With a non-blank token only its record is revoked; otherwise every
    /// active token of the user is.
    ///
    /// # Returns
    ///
    /// Number of records revoked
    pub async fn logout(&self, user_id: Uuid, raw_token: Option<&str>) -> Result<u64, TokenError> {
        let revoked = match raw_token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => {
                self.store
                    .revoke_refresh_token_by_hash(user_id, &hash_token(raw))
                    .await?
            }
            None => self.store.revoke_all_refresh_tokens(user_id).await?,
        };

        info!(user_id = %user_id, revoked, "User logged out");

        Ok(revoked)
    }
}
