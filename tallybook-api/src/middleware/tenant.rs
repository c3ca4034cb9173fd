/// Company scoping guards
///
/// Two layers run after [`require_auth`](super::auth::require_auth):
///
/// 1. [`tenant_scope`] collects company ids from the JSON body, the query
///    string and route params, and rejects any that disagree with the
///    token's company (403). The collected [`CompanyCandidates`] are left in
///    request extensions.
/// 2. [`active_company`] resolves the single company the request operates
///    on, checks the user's access when the id came from the request, and
///    inserts [`ActiveCompany`].
///
/// The body is buffered so handlers can still extract it.

use crate::{app::AppState, error::ApiError};
use axum::{
    body::{to_bytes, Body},
    extract::{Query, RawPathParams, Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tallybook_shared::auth::{
    authorization::authorize_active_company,
    middleware::AuthContext,
    tenant::{check_scope, CompanyCandidates},
};
use uuid::Uuid;

/// Largest body the tenant guard will buffer
pub const MAX_SCOPED_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Company the request operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCompany(pub Uuid);

/// Rejects explicit company ids that differ from the token's company
pub async fn tenant_scope(
    Extension(auth): Extension<AuthContext>,
    params: Option<RawPathParams>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path: Vec<(String, String)> = params
        .map(|params| {
            params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let (mut parts, body) = req.into_parts();

    let bytes = to_bytes(body, MAX_SCOPED_BODY_BYTES)
        .await
        .map_err(|_| ApiError::BadRequest("Corpo da requisicao invalido".to_string()))?;

    let json: Option<JsonValue> = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    let query: HashMap<String, String> = Query::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .unwrap_or_default();

    let candidates = CompanyCandidates::collect(json.as_ref(), &query, &path);

    check_scope(auth.company_id, &candidates).map_err(|e| {
        tracing::warn!(
            user_id = %auth.user_id,
            token_company = ?auth.company_id,
            "Cross-tenant company id rejected"
        );
        ApiError::from(e)
    })?;

    parts.extensions.insert(candidates);

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Resolves and authorizes the active company
///
/// Must run after [`tenant_scope`].
pub async fn active_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    candidates: Option<Extension<CompanyCandidates>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let candidates = candidates.map(|Extension(c)| c).unwrap_or_default();

    let company_id =
        authorize_active_company(&state.db, auth.user_id, auth.company_id, &candidates).await?;

    req.extensions_mut().insert(ActiveCompany(company_id));

    Ok(next.run(req).await)
}
