/// AI endpoints for the active company
///
/// - `POST /api/ai/analyze` - Sales analysis from arbitrary JSON, persisted per user
/// - `GET /api/ai/history` - The user's analyses, newest first
/// - `POST /api/ai/chat` - Business chat grounded on three months of sales
/// - `POST /api/chat` - Finance chat; falls back to a local answer when the
///   provider is missing or fails
///
/// Prompts follow the user's detail level.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AI_UNAVAILABLE},
    extract::ApiJson,
    middleware::tenant::ActiveCompany,
};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tallybook_shared::{
    ai::{
        context::{company_context, finance_context, RECENT_TRANSACTIONS},
        prompts::{
            analysis_prompt, business_chat_prompt, finance_chat_input, local_fallback,
            FINANCE_CHAT_SYSTEM,
        },
    },
    auth::middleware::AuthContext,
    domain::{
        aggregation::{FinanceTotals, SalesAggregates},
        insights::{build_insights, comparison_windows},
        period::{month_start, months_back},
    },
    models::{
        analysis::Analysis,
        chat_message::AiChatMessage,
        company::Company,
        sale::Sale,
        transaction::FinancialTransaction,
        user::{User, UserPlan},
    },
};
use validator::Validate;

/// Analyses per calendar month on the free plan
pub const FREE_MONTHLY_ANALYSES: i64 = 5;

/// Months of sales included in the business chat context
const CHAT_CONTEXT_MONTHS: u32 = 3;

const USER_NOT_FOUND: &str = "Usuario nao encontrado";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000, message = "A mensagem não pode estar vazia"))]
    pub message: String,
}

impl ChatRequest {
    fn question(&self) -> ApiResult<&str> {
        let question = self.message.trim();
        if question.is_empty() {
            return Err(ApiError::invalid_field(
                "message",
                "A mensagem não pode estar vazia",
            ));
        }
        Ok(question)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessChatResponse {
    pub success: bool,
    pub message: String,
    pub tokens_used: Option<i32>,
}

/// Where a finance chat answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Openai,
    Local,
}

#[derive(Debug, Serialize)]
pub struct FinanceChatResponse {
    pub message: String,
    pub source: ReplySource,
}

/// Uses `body.data` when it is an object, else the body itself
fn analysis_payload(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::Object(mut map) => match map.remove("data") {
            Some(nested @ JsonValue::Object(_)) => nested,
            Some(other) => {
                map.insert("data".to_string(), other);
                JsonValue::Object(map)
            }
            None => JsonValue::Object(map),
        },
        _ => json!({}),
    }
}

/// Runs a sales analysis and stores the generated text
///
/// # Errors
///
/// - `403`: Free plan already used its monthly analyses
/// - `503`: No provider configured or provider failure
/// - `429`: Provider quota exceeded
pub async fn analyze(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(body): ApiJson<JsonValue>,
) -> ApiResult<Json<String>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    if user.get_plan() != Some(UserPlan::Pro) {
        let used = Analysis::count_since(&state.db, user.id, month_start(Utc::now())).await?;
        if used >= FREE_MONTHLY_ANALYSES {
            return Err(ApiError::Forbidden(
                "Limite mensal atingido. Faca upgrade para PRO.".to_string(),
            ));
        }
    }

    let provider = state
        .business_ai
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable(AI_UNAVAILABLE.to_string()))?;

    let prompt = analysis_prompt(&analysis_payload(body), user.get_detail_level());
    let generation = provider.generate(None, &prompt).await?;

    Analysis::create(&state.db, user.id, &generation.text).await?;

    tracing::info!(user_id = %user.id, provider = provider.name(), "Analysis generated");

    Ok(Json(generation.text))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Analysis>>> {
    Ok(Json(Analysis::list_for_user(&state.db, auth.user_id).await?))
}

/// Answers a business question using the company's recent sales
pub async fn business_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> ApiResult<Json<BusinessChatResponse>> {
    req.validate()?;
    let question = req.question()?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    let provider = state
        .business_ai
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable(AI_UNAVAILABLE.to_string()))?;

    let window = months_back(Utc::now(), CHAT_CONTEXT_MONTHS);
    let (current, previous) = comparison_windows(window.end);

    let (company, sales, current_week, previous_week) = tokio::try_join!(
        Company::find_by_id(&state.db, company_id),
        Sale::list_in_range(&state.db, company_id, window.start, window.end),
        Sale::sum_in_range(&state.db, company_id, current.start, current.end),
        Sale::sum_in_range(&state.db, company_id, previous.start, previous.end),
    )?;

    let aggregates = SalesAggregates::build(&sales);
    let insights = build_insights(&aggregates, current_week, previous_week);
    let context = company_context(company.as_ref(), &aggregates, &insights, question);
    let prompt = business_chat_prompt(&context, user.get_detail_level());

    let generation = provider.generate(None, &prompt).await?;

    AiChatMessage::append_exchange(
        &state.db,
        company_id,
        user.id,
        question,
        &generation.text,
        generation.tokens_used,
    )
    .await?;

    tracing::info!(
        user_id = %user.id,
        company_id = %company_id,
        tokens_used = ?generation.tokens_used,
        "Business chat answered"
    );

    Ok(Json(BusinessChatResponse {
        success: true,
        message: generation.text,
        tokens_used: generation.tokens_used,
    }))
}

/// Answers a finance question from the company's totals
///
/// The body also carries `companyId`, already matched against the token by
/// the tenant guard. Provider errors never fail the request.
pub async fn finance_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> ApiResult<Json<FinanceChatResponse>> {
    req.validate()?;
    let question = req.question()?;

    let company = Company::find_by_id(&state.db, company_id)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("Empresa nao encontrada para o companyId informado".to_string())
        })?;

    let (sums, recent) = tokio::try_join!(
        FinancialTransaction::sums(&state.db, company_id),
        FinancialTransaction::recent(&state.db, company_id, RECENT_TRANSACTIONS),
    )?;
    let totals = FinanceTotals::from(sums);

    let reply = match state.finance_ai.as_ref() {
        None => FinanceChatResponse {
            message: local_fallback(&totals),
            source: ReplySource::Local,
        },
        Some(provider) => {
            let input = finance_chat_input(&finance_context(&company, &totals, &recent), question);
            match provider.generate(Some(FINANCE_CHAT_SYSTEM), &input).await {
                Ok(generation) => FinanceChatResponse {
                    message: generation.text,
                    source: ReplySource::Openai,
                },
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        provider = provider.name(),
                        "Finance chat provider failed, using local answer"
                    );
                    FinanceChatResponse {
                        message: local_fallback(&totals),
                        source: ReplySource::Local,
                    }
                }
            }
        }
    };

    AiChatMessage::append_exchange(
        &state.db,
        company_id,
        auth.user_id,
        question,
        &reply.message,
        None,
    )
    .await?;

    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_payload_prefers_nested_object() {
        let nested = analysis_payload(json!({ "data": { "total": 10 }, "extra": true }));
        assert_eq!(nested, json!({ "total": 10 }));

        let flat = analysis_payload(json!({ "data": [1, 2], "total": 10 }));
        assert_eq!(flat, json!({ "data": [1, 2], "total": 10 }));

        assert_eq!(analysis_payload(json!([1, 2, 3])), json!({}));
    }

    #[test]
    fn test_chat_request_rejects_blank_message() {
        let blank = ChatRequest {
            message: "   ".to_string(),
        };
        assert!(blank.validate().is_ok());
        assert!(blank.question().is_err());

        let missing = ChatRequest::default();
        assert!(missing.validate().is_err());

        let long = ChatRequest {
            message: "a".repeat(2001),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_reply_source_serializes_lowercase() {
        let reply = FinanceChatResponse {
            message: "ok".to_string(),
            source: ReplySource::Openai,
        };
        assert_eq!(serde_json::to_value(&reply).unwrap()["source"], "openai");
    }
}
