/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `ApiResult<T>`; library errors convert with `?`.
///
/// Every error body has the shape:
///
/// ```json
/// { "error": "forbidden", "message": "...", "statusCode": 403 }
/// ```
///
/// with an extra `details` array for validation errors. Malformed JSON bodies
/// go through [`ApiJson`](crate::extract::ApiJson) and get the same shape.
///
/// # Example
///
/// ```no_run
/// use tallybook_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Venda nao encontrada".to_string()));
///     }
///     Ok(Json(json!({ "deleted": true })))
/// }
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tallybook_shared::{
    ai::AiError,
    auth::{
        authorization::AuthzError, jwt::JwtError, middleware::AuthError,
        password::PasswordError, tenant::TenantError, tokens::TokenError,
    },
    webhooks::WebhookError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Message for every AI failure that is not a quota problem
pub const AI_UNAVAILABLE: &str = "Servico de IA indisponivel no momento";

/// Message for AI quota errors
pub const AI_QUOTA_EXCEEDED: &str =
    "Limite da IA excedido no momento. Tente novamente em alguns minutos.";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403), including cross-tenant access
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email or slug
    Conflict(String),

    /// Bad request (400) with per-field details
    ValidationError(Vec<ValidationErrorDetail>),

    /// Too many requests (429)
    RateLimitExceeded { retry_after: u64, message: String },

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status, repeated in the body
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RateLimitExceeded { message, .. } => {
                write!(f, "Rate limit exceeded: {}", message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            ApiError::RateLimitExceeded { retry_after, .. } => Some(*retry_after),
            _ => None,
        };

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Dados invalidos".to_string()),
                Some(errors),
            ),
            ApiError::RateLimitExceeded { message, .. } => ("rate_limit_exceeded", message, None),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                (
                    "internal_error",
                    "Erro interno do servidor".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg, None),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            status_code: status.as_u16(),
            details,
        });

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Convert sqlx errors to API errors
///
/// Constraint violations become 4xx responses; pool exhaustion becomes 503.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Registro nao encontrado".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                tracing::warn!(error = %err, "Database pool unavailable");
                ApiError::ServiceUnavailable("Banco de dados indisponivel no momento".to_string())
            }
            sqlx::Error::Database(db_err) => {
                from_sqlstate(db_err.code().as_deref(), db_err.constraint().unwrap_or_default())
                    .unwrap_or_else(|| {
                        ApiError::InternalError(format!("Database error: {}", db_err))
                    })
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Client-caused Postgres errors by SQLSTATE; `None` for everything else
fn from_sqlstate(code: Option<&str>, constraint: &str) -> Option<ApiError> {
    let err = match code? {
        "23505" if constraint.contains("email") => {
            ApiError::Conflict("E-mail ja cadastrado".to_string())
        }
        "23505" if constraint.contains("slug") => {
            ApiError::Conflict("Slug da empresa ja esta em uso".to_string())
        }
        "23505" => ApiError::Conflict("Registro duplicado (violacao de unicidade)".to_string()),
        "23503" => ApiError::BadRequest("Referencia invalida entre entidades".to_string()),
        "22001" => ApiError::BadRequest("Valor excede o tamanho permitido".to_string()),
        "23514" | "22P02" => {
            ApiError::BadRequest("Dados invalidos para operacao no banco".to_string())
        }
        _ => return None,
    };
    Some(err)
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "JSON body rejected");
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::BadRequest("Content-Type deve ser application/json".to_string())
            }
            _ => ApiError::BadRequest("JSON invalido no corpo da requisicao".to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} invalido", field)),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Token ausente".to_string()),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                ApiError::Unauthorized(msg)
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Unauthorized(msg) => ApiError::Unauthorized(msg.to_string()),
            TokenError::Signing(e) => ApiError::InternalError(format!("Token signing failed: {}", e)),
            TokenError::Database(e) => e.into(),
        }
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::Mismatch => ApiError::Forbidden(err.to_string()),
            TenantError::Missing | TenantError::Invalid | TenantError::Conflicting => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Tenant(e) => e.into(),
            AuthzError::NoAccess(_) => {
                ApiError::Forbidden("Acesso negado: empresa nao pertence ao usuario".to_string())
            }
            AuthzError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::QuotaExceeded(detail) => {
                tracing::warn!(detail = %detail, "AI provider quota exceeded");
                ApiError::RateLimitExceeded {
                    retry_after: 60,
                    message: AI_QUOTA_EXCEEDED.to_string(),
                }
            }
            AiError::NotConfigured => ApiError::ServiceUnavailable(AI_UNAVAILABLE.to_string()),
            other => {
                tracing::error!(error = %other, "AI provider call failed");
                ApiError::ServiceUnavailable(AI_UNAVAILABLE.to_string())
            }
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSignature(msg) => ApiError::BadRequest(msg.to_string()),
            WebhookError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(_) => ApiError::InternalError(err.to_string()),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}
