/// Profile endpoints
///
/// - `GET /api/profile`
/// - `PATCH /api/profile`, `PATCH /api/user/profile`
/// - `PATCH /api/profile/change-password`, `PATCH /api/user/change-password`
/// - `DELETE /api/profile`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tallybook_shared::{
    auth::{
        middleware::AuthContext,
        password::{hash_password, verify_password},
    },
    models::{
        company::Company,
        refresh_token::RefreshToken,
        user::{DetailLevel, UpdateProfile, User, UserProfile},
    },
};
use validator::Validate;

const USER_NOT_FOUND: &str = "Usuario nao encontrado";

/// Profile plus the number of accessible companies
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub company_count: i64,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 80, message = "Nome deve ter entre 2 e 80 caracteres"))]
    pub name: Option<String>,

    /// `low`, `medium` or `high`
    pub detail_level: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Senha atual é obrigatória"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "A nova senha deve ter no minimo 8 caracteres"))]
    pub new_password: String,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = User::profile(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    let company_count = Company::count_for_user(&state.db, auth.user_id).await?;

    Ok(Json(ProfileResponse {
        profile,
        company_count,
    }))
}

/// Updates name and/or detail level; omitted fields are kept
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    req.validate()?;

    let detail_level = match req.detail_level.as_deref() {
        None => None,
        Some(raw) => Some(DetailLevel::from_str(raw).ok_or_else(|| {
            ApiError::invalid_field("detailLevel", "detailLevel deve ser low, medium ou high")
        })?),
    };

    let profile = User::update_profile(
        &state.db,
        auth.user_id,
        UpdateProfile {
            name: req.name,
            detail_level,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %auth.user_id, "Profile updated");

    Ok(Json(profile))
}

/// Replaces the password after checking the current one
///
/// # Errors
///
/// - `400`: New password equals the current one, or the current one is wrong
/// - `404`: User no longer exists
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<JsonValue>> {
    req.validate()?;

    if req.current_password == req.new_password {
        return Err(ApiError::BadRequest(
            "A nova senha deve ser diferente da senha atual".to_string(),
        ));
    }

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::BadRequest("Senha atual invalida".to_string()));
    }

    let password_hash = hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(json!({ "success": true })))
}

/// Deletes the account
///
/// Owned companies are kept with no owner and open refresh tokens are
/// revoked; all steps share one transaction.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<JsonValue>> {
    let mut tx = state.db.begin().await?;

    let detached = Company::detach_owner(&mut *tx, auth.user_id).await?;
    RefreshToken::revoke_all_for_user(&mut *tx, auth.user_id).await?;
    if !User::delete(&mut *tx, auth.user_id).await? {
        return Err(ApiError::NotFound(USER_NOT_FOUND.to_string()));
    }

    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, detached_companies = detached, "Account deleted");

    Ok(Json(json!({ "success": true })))
}
