/// Tenant scope resolution
///
/// Every tenant-scoped request carries at most one company id in its access
/// token and any number of explicit `companyId` / `company_id` values in its
/// JSON body, query string or route params. This module decides, without
/// touching the database, whether those agree and which company the request
/// operates on.
///
/// - [`check_scope`]: an explicit id that differs from the token's is rejected.
///   A token without a company lets the request through.
/// - [`resolve_active_company`]: picks the company to operate on, preferring
///   the token's and otherwise accepting a single id from the request. Ids
///   taken from the request must still pass an access check against the
///   database before use (see `authorization::require_company_access`).
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use tallybook_shared::auth::tenant::{check_scope, CompanyCandidates, TenantError};
/// use serde_json::json;
/// use uuid::Uuid;
///
/// let token_company = Uuid::new_v4();
/// let other = Uuid::new_v4();
/// let body = json!({ "companyId": other.to_string() });
///
/// let candidates = CompanyCandidates::collect(Some(&body), &HashMap::new(), &[]);
/// assert_eq!(check_scope(Some(token_company), &candidates), Err(TenantError::Mismatch));
/// ```

use std::collections::{BTreeSet, HashMap};

use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Request keys that name a company
pub const COMPANY_KEYS: [&str; 2] = ["companyId", "company_id"];

/// Error type for tenant resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantError {
    /// Explicit company id differs from the token's
    #[error("Acesso negado: company_id não corresponde ao token")]
    Mismatch,

    /// No company id anywhere
    #[error("companyId nao informado")]
    Missing,

    /// Request names a value that is not a company id
    #[error("companyId invalido")]
    Invalid,

    /// Request names more than one company
    #[error("companyId conflitante na requisicao")]
    Conflicting,
}

/// Company ids found in a request, in body → query → path order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyCandidates(Vec<String>);

impl CompanyCandidates {
    /// Collects non-blank company ids from a JSON body, a query map and route params
    ///
    /// Only top-level body keys are considered. Non-string JSON values are
    /// kept in their JSON text form so they fail to parse as ids later.
    pub fn collect(
        body: Option<&JsonValue>,
        query: &HashMap<String, String>,
        path: &[(String, String)],
    ) -> Self {
        let mut values = Vec::new();

        if let Some(JsonValue::Object(map)) = body {
            for key in COMPANY_KEYS {
                match map.get(key) {
                    None | Some(JsonValue::Null) => {}
                    Some(JsonValue::String(s)) => values.push(s.clone()),
                    Some(other) => values.push(other.to_string()),
                }
            }
        }

        for key in COMPANY_KEYS {
            if let Some(v) = query.get(key) {
                values.push(v.clone());
            }
        }

        for (key, value) in path {
            if COMPANY_KEYS.contains(&key.as_str()) {
                values.push(value.clone());
            }
        }

        Self(
            values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        )
    }

    /// Builds candidates from raw values (already extracted)
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            values
                .into_iter()
                .map(|v| v.into().trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Where the active company id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedCompany {
    /// Token's company; already trusted
    Token(Uuid),

    /// Supplied by the request; needs an access check
    Request(Uuid),
}

impl ResolvedCompany {
    pub fn id(&self) -> Uuid {
        match self {
            ResolvedCompany::Token(id) | ResolvedCompany::Request(id) => *id,
        }
    }
}

/// Rejects explicit company ids that disagree with the token's company
///
/// A value that is not a UUID never equals the token's company and is a
/// mismatch too. With no company in the token everything passes.
pub fn check_scope(
    token_company: Option<Uuid>,
    candidates: &CompanyCandidates,
) -> Result<(), TenantError> {
    let Some(token_company) = token_company else {
        return Ok(());
    };

    for raw in candidates.iter() {
        match Uuid::parse_str(raw) {
            Ok(id) if id == token_company => {}
            _ => return Err(TenantError::Mismatch),
        }
    }

    Ok(())
}

/// Determines the company a request operates on
///
/// # Errors
///
/// - `Mismatch` if the token has a company and the request names another
/// - `Missing` if neither the token nor the request names a company
/// - `Invalid` if the request names something that is not a UUID
/// - `Conflicting` if the request names two different companies
pub fn resolve_active_company(
    token_company: Option<Uuid>,
    candidates: &CompanyCandidates,
) -> Result<ResolvedCompany, TenantError> {
    if let Some(id) = token_company {
        check_scope(Some(id), candidates)?;
        return Ok(ResolvedCompany::Token(id));
    }

    let mut distinct = BTreeSet::new();
    for raw in candidates.iter() {
        let id = Uuid::parse_str(raw).map_err(|_| TenantError::Invalid)?;
        distinct.insert(id);
    }

    let mut ids = distinct.into_iter();
    match (ids.next(), ids.next()) {
        (None, _) => Err(TenantError::Missing),
        (Some(id), None) => Ok(ResolvedCompany::Request(id)),
        (Some(_), Some(_)) => Err(TenantError::Conflicting),
    }
}
