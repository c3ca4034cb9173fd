/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Access/refresh JWT creation and validation
/// - [`store`]: Credential persistence seam (`CredentialStore`)
/// - [`tokens`]: Token issuance, single-use refresh rotation and logout
/// - [`middleware`]: Bearer extraction and `AuthContext`
/// - [`tenant`]: Pure company-scope resolution
/// - [`authorization`]: Database-backed company access checks
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256, separate access and refresh secrets
/// - **Refresh Tokens**: stored as SHA-256 only, revoked on use
///
/// # Example
///
/// ```
/// use tallybook_shared::auth::password::{hash_password, verify_password};
/// use tallybook_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("secret1")?;
/// assert!(verify_password("secret1", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "a@b.com", None, TokenType::Access, Duration::minutes(15));
/// let token = create_token(&claims, "secret-key")?;
/// validate_access_token(&token, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod store;
pub mod tenant;
pub mod tokens;
