/// Authentication endpoints
///
/// - `POST /api/auth/register` - Create user and company, start a session
/// - `POST /api/auth/login` - Exchange credentials for tokens
/// - `POST /api/auth/refresh` - Rotate a refresh token (single use)
/// - `POST /api/auth/logout` - Revoke one or all refresh tokens
/// - `GET /api/auth/me` - Claims of the presented access token
///
/// Token responses carry each token under both snake_case and camelCase
/// names, plus the user:
///
/// ```json
/// {
///   "access_token": "eyJ...", "accessToken": "eyJ...",
///   "refresh_token": "eyJ...", "refreshToken": "eyJ...",
///   "expires_in": "15m",
///   "user": { "id": "...", "email": "...", "name": "...", "detailLevel": "medium",
///             "companyId": "...", "companyName": "Acme" }
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tallybook_shared::{
    auth::{
        middleware::AuthContext,
        password::{hash_password, verify_password},
        store::SessionUser,
        tokens::AuthSession,
    },
    domain::slug::{is_valid_slug, slugify, FALLBACK_SLUG},
    models::{
        company::{Company, CreateCompany},
        user::{CreateUser, User},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Name given to users who register without one
pub const DEFAULT_USER_NAME: &str = "Administrador";

const INVALID_CREDENTIALS: &str = "Credenciais invalidas";

/// Register request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,

    #[validate(length(min = 6, message = "Senha deve ter no mínimo 6 caracteres"))]
    pub password: String,

    #[validate(length(min = 1, max = 120, message = "Nome da empresa é obrigatório"))]
    pub company_name: String,

    /// Lowercase letters, digits and hyphens; derived from the company name if absent
    #[validate(length(max = 50, message = "Slug deve ter no maximo 50 caracteres"))]
    pub company_slug: Option<String>,

    #[validate(length(max = 80, message = "Nome muito longo"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,

    #[validate(length(min = 6, message = "Senha deve ter no mínimo 6 caracteres"))]
    pub password: String,
}

/// Refresh/logout body; the token may use either naming style
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

impl RefreshRequest {
    fn token(body: &Option<Json<RefreshRequest>>) -> Option<&str> {
        body.as_ref()
            .and_then(|Json(b)| b.refresh_token.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Builds the user snapshot returned next to tokens
pub(crate) async fn session_user(state: &AppState, user: &User) -> ApiResult<SessionUser> {
    let company_name = match user.company_id {
        Some(company_id) => Company::find_by_id(&state.db, company_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_default(),
        None => String::new(),
    };

    Ok(SessionUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        detail_level: user.get_detail_level().as_str().to_string(),
        company_id: user.company_id,
        company_name,
    })
}

/// Register a new user together with their company
///
/// User and company are created in one transaction; the user owns the
/// company and has it as primary company, so the access token carries its id.
///
/// # Errors
///
/// - `400`: Validation failed
/// - `409`: Email or company slug already in use
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    req.validate()?;

    let company_name = req.company_name.trim().to_string();
    if company_name.is_empty() {
        return Err(ApiError::invalid_field(
            "companyName",
            "Nome da empresa é obrigatório",
        ));
    }

    let slug = match req.company_slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) if is_valid_slug(slug) => slug.to_string(),
        Some(_) => {
            return Err(ApiError::invalid_field(
                "companySlug",
                "Slug deve conter apenas letras minusculas, numeros e hifens",
            ))
        }
        None => match slugify(&company_name) {
            derived if derived.is_empty() => FALLBACK_SLUG.to_string(),
            derived => derived,
        },
    };

    if User::email_exists(&state.db, &req.email).await? {
        return Err(ApiError::Conflict("E-mail ja cadastrado".to_string()));
    }
    if Company::slug_exists(&state.db, &slug).await? {
        return Err(ApiError::Conflict(
            "Slug da empresa ja esta em uso".to_string(),
        ));
    }

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_USER_NAME)
        .to_string();

    let password_hash = hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: req.email.clone(),
            password_hash,
            name: name.clone(),
        },
    )
    .await?;

    let company = Company::create(
        &mut *tx,
        CreateCompany {
            name: company_name,
            slug,
            owner_id: Some(user.id),
            ..Default::default()
        },
    )
    .await?;

    User::set_company(&mut *tx, user.id, company.id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, company_id = %company.id, "User registered");

    let session = state
        .tokens
        .start_session(SessionUser {
            id: user.id,
            email: user.email.clone(),
            name: Some(name),
            detail_level: user.get_detail_level().as_str().to_string(),
            company_id: Some(company.id),
            company_name: company.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Login with email and password
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthSession>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let session = state
        .tokens
        .start_session(session_user(&state, &user).await?)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(session))
}

/// Exchange a refresh token for a new pair
///
/// The presented token is revoked; using it again fails with 401.
pub async fn refresh(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<Json<AuthSession>> {
    let session = state.tokens.refresh(RefreshRequest::token(&body)).await?;
    Ok(Json(session))
}

/// Revoke the given refresh token, or all of the user's tokens without one
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<Json<JsonValue>> {
    let revoked = state
        .tokens
        .logout(auth.user_id, RefreshRequest::token(&body))
        .await?;

    tracing::info!(user_id = %auth.user_id, revoked, "User logged out");

    Ok(Json(json!({ "success": true })))
}

/// Claims carried by the access token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub sub: Uuid,
    pub email: String,
    pub company_id: Option<Uuid>,
}

impl From<AuthContext> for MeResponse {
    fn from(auth: AuthContext) -> Self {
        Self {
            sub: auth.user_id,
            email: auth.email,
            company_id: auth.company_id,
        }
    }
}

/// Current token claims; no database access
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<MeResponse> {
    Json(auth.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let valid = RegisterRequest {
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
            company_name: "Acme".to_string(),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let invalid = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "123".to_string(),
            ..Default::default()
        };
        let errors = invalid.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);
    }

    #[test]
    fn test_register_slug_capped_at_column_length() {
        let mut req = RegisterRequest {
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
            company_name: "Acme".to_string(),
            company_slug: Some("a".repeat(50)),
            ..Default::default()
        };
        assert!(req.validate().is_ok());

        req.company_slug = Some("a".repeat(51));
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("company_slug"));
    }

    #[test]
    fn test_me_echoes_token_claims() {
        let company = Uuid::new_v4();
        let auth = AuthContext {
            user_id: Uuid::new_v4(),
            email: "owner@acme.test".to_string(),
            company_id: Some(company),
        };

        let body = serde_json::to_value(MeResponse::from(auth.clone())).unwrap();
        assert_eq!(body["sub"], auth.user_id.to_string());
        assert_eq!(body["email"], "owner@acme.test");
        assert_eq!(body["companyId"], company.to_string());
    }

    #[test]
    fn test_register_body_is_camel_case() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "a@b.com",
            "password": "secret1",
            "companyName": "Acme",
            "companySlug": "acme-ltda"
        }))
        .unwrap();

        assert_eq!(req.company_name, "Acme");
        assert_eq!(req.company_slug.as_deref(), Some("acme-ltda"));
        assert!(req.name.is_none());
    }

    #[test]
    fn test_refresh_token_accepts_both_names() {
        let snake: RefreshRequest =
            serde_json::from_value(json!({ "refresh_token": "abc" })).unwrap();
        let camel: RefreshRequest =
            serde_json::from_value(json!({ "refreshToken": " abc " })).unwrap();

        assert_eq!(RefreshRequest::token(&Some(Json(snake))), Some("abc"));
        assert_eq!(RefreshRequest::token(&Some(Json(camel))), Some("abc"));
        assert_eq!(RefreshRequest::token(&None), None);

        let blank: RefreshRequest =
            serde_json::from_value(json!({ "refreshToken": "  " })).unwrap();
        assert_eq!(RefreshRequest::token(&Some(Json(blank))), None);
    }
}
