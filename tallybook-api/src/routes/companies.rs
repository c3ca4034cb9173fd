/// Company endpoints, mounted at both `/api/companies` and `/api/company`
///
/// - `GET` - Companies the user owns or has as primary company, newest first
/// - `POST` - Create a company and make it the user's primary company

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use tallybook_shared::{
    auth::middleware::AuthContext,
    domain::slug::{candidate_slugs, is_valid_slug, slugify},
    models::{
        company::{Company, CreateCompany},
        user::User,
    },
};
use validator::Validate;

/// Create company request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 2, max = 120, message = "Nome deve ter entre 2 e 120 caracteres"))]
    pub name: String,

    #[validate(length(min = 2, max = 80, message = "Setor deve ter entre 2 e 80 caracteres"))]
    pub sector: Option<String>,

    #[validate(length(min = 3, max = 500, message = "Descricao deve ter entre 3 e 500 caracteres"))]
    pub description: Option<String>,

    #[validate(length(min = 2, max = 50, message = "Slug deve ter entre 2 e 50 caracteres"))]
    pub slug: Option<String>,

    #[validate(length(max = 10, message = "Moeda deve ter no maximo 10 caracteres"))]
    pub currency: Option<String>,

    #[validate(length(max = 80, message = "Fuso horario deve ter no maximo 80 caracteres"))]
    pub timezone: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn list_companies(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Company>>> {
    let companies = Company::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(companies))
}

/// Creates a company owned by the user
///
/// The slug (given or derived from the name) gets the first free suffix
/// among `-2` to `-99` when taken.
///
/// # Errors
///
/// - `400`: Validation failed
/// - `409`: No free slug
pub async fn create_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    req.validate()?;

    let name = req.name.trim().to_string();
    if name.chars().count() < 2 {
        return Err(ApiError::invalid_field(
            "name",
            "Nome deve ter entre 2 e 120 caracteres",
        ));
    }

    let base = match trimmed(req.slug) {
        Some(slug) if is_valid_slug(&slug) => slug,
        Some(_) => {
            return Err(ApiError::invalid_field(
                "slug",
                "Slug deve conter apenas letras minusculas, numeros e hifen",
            ))
        }
        None => slugify(&name),
    };

    if User::find_by_id(&state.db, auth.user_id).await?.is_none() {
        return Err(ApiError::NotFound("Usuario nao encontrado".to_string()));
    }

    let mut slug = None;
    for candidate in candidate_slugs(&base) {
        if !Company::slug_exists(&state.db, &candidate).await? {
            slug = Some(candidate);
            break;
        }
    }
    let slug = slug.ok_or_else(|| {
        ApiError::Conflict("Nao foi possivel gerar slug unico para a empresa".to_string())
    })?;

    let mut tx = state.db.begin().await?;

    let company = Company::create(
        &mut *tx,
        CreateCompany {
            name,
            slug,
            sector: trimmed(req.sector),
            description: trimmed(req.description),
            currency: trimmed(req.currency),
            timezone: trimmed(req.timezone),
            owner_id: Some(auth.user_id),
        },
    )
    .await?;

    User::set_company(&mut *tx, auth.user_id, company.id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, company_id = %company.id, slug = %company.slug, "Company created");

    Ok((StatusCode::CREATED, Json(company)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_company_validation() {
        let valid = CreateCompanyRequest {
            name: "Padaria".to_string(),
            currency: Some("BRL".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateCompanyRequest {
            name: "P".to_string(),
            sector: Some("x".to_string()),
            description: Some("ab".to_string()),
            currency: Some("TOO-LONG-CODE".to_string()),
            ..Default::default()
        };
        assert_eq!(invalid.validate().unwrap_err().field_errors().len(), 4);
    }

    #[test]
    fn test_slug_capped_at_column_length() {
        let fits = CreateCompanyRequest {
            name: "Padaria".to_string(),
            slug: Some("p".repeat(50)),
            ..Default::default()
        };
        assert!(fits.validate().is_ok());

        let too_long = CreateCompanyRequest {
            slug: Some("p".repeat(51)),
            ..fits
        };
        let errors = too_long.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("slug"));
    }

    #[test]
    fn test_trimmed_drops_blank_values() {
        assert_eq!(trimmed(Some("  Varejo ".to_string())), Some("Varejo".to_string()));
        assert_eq!(trimmed(Some("   ".to_string())), None);
        assert_eq!(trimmed(None), None);
    }
}
