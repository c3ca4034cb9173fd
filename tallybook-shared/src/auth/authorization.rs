/// Company access checks
///
/// The pure resolver in [`super::tenant`] decides which company a request
/// names. This module confirms against the database that the user may act on
/// a company that came from the request rather than from the token.
///
/// # Example
///
/// ```no_run
/// use tallybook_shared::auth::authorization::authorize_active_company;
/// use tallybook_shared::auth::tenant::CompanyCandidates;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, requested: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let candidates = CompanyCandidates::from_values([requested.to_string()]);
/// let company_id = authorize_active_company(&pool, user_id, None, &candidates).await?;
/// assert_eq!(company_id, requested);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::tenant::{resolve_active_company, CompanyCandidates, ResolvedCompany, TenantError};
use crate::models::company::Company;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Company scope could not be resolved
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// User neither owns nor belongs to the company
    #[error("Acesso negado a empresa {0}")]
    NoAccess(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks that the user owns the company or has it as primary company
///
/// # Errors
///
/// Returns `AuthzError::NoAccess` if neither holds
pub async fn require_company_access(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Uuid,
) -> Result<(), AuthzError> {
    if !Company::user_has_access(pool, company_id, user_id).await? {
        warn!(user_id = %user_id, company_id = %company_id, "Company access denied");
        return Err(AuthzError::NoAccess(company_id));
    }

    Ok(())
}

/// Resolves the active company and verifies access when it came from the request
pub async fn authorize_active_company(
    pool: &PgPool,
    user_id: Uuid,
    token_company: Option<Uuid>,
    candidates: &CompanyCandidates,
) -> Result<Uuid, AuthzError> {
    match resolve_active_company(token_company, candidates)? {
        ResolvedCompany::Token(id) => Ok(id),
        ResolvedCompany::Request(id) => {
            require_company_access(pool, user_id, id).await?;
            Ok(id)
        }
    }
}
