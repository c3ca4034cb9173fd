/// JWT token generation and validation
///
/// Tokens are signed with HS256. Access and refresh tokens share one claims
/// shape and are told apart by the `type` claim; refresh tokens also carry a
/// random `jti` so that two refresh tokens minted in the same second for the
/// same user never hash to the same value.
///
/// # Claims
///
/// - `sub`: user id
/// - `email`: user email at issuance
/// - `companyId`: active company at issuance (absent while the user has none)
/// - `iss`: always `"tallybook"`
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `type`: `"access"` or `"refresh"`
/// - `jti`: refresh tokens only
///
/// # Example
///
/// ```
/// use tallybook_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let claims = Claims::new(user_id, "a@b.com", None, TokenType::Access, Duration::minutes(15));
/// let token = create_token(&claims, "access-secret")?;
///
/// let validated = validate_access_token(&token, "access-secret")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim written into and required on every token
pub const ISSUER: &str = "tallybook";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token is well-formed but of the wrong kind for this use
    #[error("Wrong token type: expected {expected}")]
    WrongType { expected: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token presented on every request
    Access,

    /// Long-lived, single-use token exchanged for a new pair
    Refresh,
}

impl TokenType {
    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// User email at issuance
    pub email: String,

    /// Company in scope at issuance
    #[serde(rename = "companyId", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,

    /// Issuer - Always "tallybook"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Access or refresh
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Unique token id (refresh tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
}

impl Claims {
    /// Creates claims expiring `expires_in` from now
    ///
    /// Refresh claims get a fresh random `jti`; access claims get none.
    pub fn new(
        user_id: Uuid,
        email: &str,
        company_id: Option<Uuid>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            email: email.to_string(),
            company_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            token_type,
            jti: match token_type {
                TokenType::Access => None,
                TokenType::Refresh => Some(Uuid::new_v4()),
            },
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Creates a signed JWT from claims
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiry, not-before and issuer, and returns the claims
///
/// # Errors
///
/// - `JwtError::Expired` when `exp` has passed
/// - `JwtError::InvalidIssuer` when `iss` is not `"tallybook"`
/// - `JwtError::ValidationError` for any other failure (bad signature, garbage input)
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates a token and requires it to be an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongType { expected: "access" });
    }

    Ok(claims)
}

/// Validates a token and requires the refresh marker and a `jti`
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Refresh || claims.jti.is_none() {
        return Err(JwtError::WrongType { expected: "refresh" });
    }

    Ok(claims)
}

/// Parses a lifetime string such as `"15m"`, `"12h"` or `"30d"`
///
/// Input is trimmed and lowercased first. Anything other than digits followed
/// by a single `m`, `h` or `d` returns `None`.
///
/// ```
/// use tallybook_shared::auth::jwt::parse_duration;
/// use chrono::Duration;
///
/// assert_eq!(parse_duration(" 15M "), Some(Duration::minutes(15)));
/// assert_eq!(parse_duration("30d"), Some(Duration::days(30)));
/// assert_eq!(parse_duration("1w"), None);
/// ```
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let value = raw.trim().to_lowercase();
    let unit = value.chars().last()?;
    let digits = &value[..value.len() - unit.len_utf8()];

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let amount: i64 = digits.parse().ok()?;

    match unit {
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn access(company_id: Option<Uuid>) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "owner@acme.test",
            company_id,
            TokenType::Access,
            Duration::minutes(15),
        )
    }

    #[test]
    fn test_claims_creation() {
        let company_id = Uuid::new_v4();
        let claims = access(Some(company_id));

        assert_eq!(claims.company_id, Some(company_id));
        assert_eq!(claims.iss, "tallybook");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.jti.is_none());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_refresh_claims_get_unique_jti() {
        let user_id = Uuid::new_v4();
        let a = Claims::new(user_id, "a@b.com", None, TokenType::Refresh, Duration::days(30));
        let b = Claims::new(user_id, "a@b.com", None, TokenType::Refresh, Duration::days(30));

        assert!(a.jti.is_some());
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_wire_format_uses_camel_case_company_and_type() {
        let company_id = Uuid::new_v4();
        let value = serde_json::to_value(access(Some(company_id))).unwrap();

        assert_eq!(value["companyId"], company_id.to_string());
        assert_eq!(value["type"], "access");
        assert!(value.get("jti").is_none());

        let without_company = serde_json::to_value(access(None)).unwrap();
        assert!(without_company.get("companyId").is_none());
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = access(None);
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.email, "owner@acme.test");
        assert_eq!(validated.company_id, None);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&access(None), "secret1").unwrap();
        assert!(matches!(
            validate_token(&token, "wrong-secret"),
            Err(JwtError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = Claims::new(
            Uuid::new_v4(),
            "a@b.com",
            None,
            TokenType::Access,
            Duration::seconds(-3600),
        );
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let access_token = create_token(&access(None), SECRET).unwrap();
        let refresh_claims = Claims::new(
            Uuid::new_v4(),
            "a@b.com",
            None,
            TokenType::Refresh,
            Duration::days(30),
        );
        let refresh_token = create_token(&refresh_claims, SECRET).unwrap();

        assert!(validate_access_token(&access_token, SECRET).is_ok());
        assert!(validate_refresh_token(&refresh_token, SECRET).is_ok());
        assert!(matches!(
            validate_access_token(&refresh_token, SECRET),
            Err(JwtError::WrongType { expected: "access" })
        ));
        assert!(matches!(
            validate_refresh_token(&access_token, SECRET),
            Err(JwtError::WrongType { expected: "refresh" })
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validate_token("not.a.jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("15m"), Some(Duration::minutes(15)));
        assert_eq!(parse_duration("12h"), Some(Duration::hours(12)));
        assert_eq!(parse_duration("30d"), Some(Duration::days(30)));
        assert_eq!(parse_duration("  7D "), Some(Duration::days(7)));
    }

    #[test]
    fn test_parse_duration_rejects_other_shapes() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("15"), None);
        assert_eq!(parse_duration("15s"), None);
        assert_eq!(parse_duration("1.5h"), None);
        assert_eq!(parse_duration("-5m"), None);
        assert_eq!(parse_duration("15 m"), None);
    }
}
