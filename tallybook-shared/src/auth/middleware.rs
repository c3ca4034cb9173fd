/// Bearer-token authentication primitives for Axum
///
/// Extracts the access token from `Authorization: Bearer <token>`, validates
/// it and turns its claims into an [`AuthContext`]. The API's middleware puts
/// that context into request extensions for handlers and later guards.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use tallybook_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}, company: {:?}", auth.user_id, auth.company_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};

/// Authentication context added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Email at token issuance
    pub email: String,

    /// Company in the token, if the user had one at issuance
    pub company_id: Option<Uuid>,
}

impl AuthContext {
    /// Creates auth context from access-token claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            company_id: claims.company_id,
        }
    }
}

/// Error type for bearer authentication
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),
}

/// Returns the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// Validates the bearer access token in `headers`
///
/// # Errors
///
/// - `MissingCredentials` if there is no bearer token
/// - `InvalidFormat` if the header is not a Bearer header
/// - `InvalidToken` if the token is expired, forged, or a refresh token
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        JwtError::WrongType { .. } => AuthError::InvalidToken("Access token required".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(AuthContext::from_claims(&claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, TokenType};
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn token(kind: TokenType, company_id: Option<Uuid>) -> (Claims, String) {
        let claims = Claims::new(Uuid::new_v4(), "a@b.com", company_id, kind, Duration::minutes(5));
        let token = create_token(&claims, SECRET).unwrap();
        (claims, token)
    }

    #[test]
    fn test_authenticate_valid_access_token() {
        let company_id = Uuid::new_v4();
        let (claims, token) = token(TokenType::Access, Some(company_id));

        let context = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();

        assert_eq!(context.user_id, claims.sub);
        assert_eq!(context.email, "a@b.com");
        assert_eq!(context.company_id, Some(company_id));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            authenticate(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            authenticate(&headers_with("Bearer "), SECRET),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_non_bearer_scheme() {
        assert!(matches!(
            authenticate(&headers_with("Basic abc"), SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_refresh_token_is_not_accepted_as_access() {
        let (_, token) = token(TokenType::Refresh, None);
        assert_eq!(
            authenticate(&headers_with(&format!("Bearer {}", token)), SECRET),
            Err(AuthError::InvalidToken("Access token required".to_string()))
        );
    }

    #[test]
    fn test_wrong_secret() {
        let (_, token) = token(TokenType::Access, None);
        assert!(matches!(
            authenticate(&headers_with(&format!("Bearer {}", token)), "another-secret"),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
