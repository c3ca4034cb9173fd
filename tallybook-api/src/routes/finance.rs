/// Finance endpoints
///
/// Active-company routes:
///
/// - `GET /api/financial`, `GET /api/financial/transactions` - Filtered list
/// - `POST /api/financial`, `POST /api/financial/transactions`, `POST /api/transactions`
/// - `GET /api/financial/summary` - Dashboard summary of the active company
/// - `GET /api/financial/report` - Totals with a per-category breakdown
/// - `GET /api/financial/:companyId` - Filtered list for an explicit company
///
/// `GET /api/transactions` lists the user's primary company without the
/// active-company guard.

use super::{dashboard::company_summary, PeriodQuery};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    middleware::tenant::ActiveCompany,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tallybook_shared::{
    auth::middleware::AuthContext,
    domain::{
        aggregation::{DashboardSummary, FinanceReport, FinanceTotals},
        period::parse_instant,
    },
    models::{
        transaction::{CreateTransaction, FinancialTransaction, TransactionFilter, TransactionType},
        user::User,
    },
};
use validator::Validate;

const TYPE_MESSAGE: &str = "type deve ser income ou expense";
const DATE_MESSAGE: &str = "Data da transacao invalida";

/// Create transaction request
///
/// `companyId` is optional here; when present the tenant guard has already
/// matched it against the token.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub company_id: Option<String>,

    #[serde(rename = "type")]
    pub kind: String,

    #[validate(range(min = 0.01, message = "O valor deve ser maior que zero"))]
    pub amount: f64,

    #[validate(length(min = 1, max = 255, message = "Descricao deve ter entre 1 e 255 caracteres"))]
    pub description: String,

    #[validate(length(max = 100, message = "Categoria muito longa"))]
    pub category: Option<String>,

    pub occurred_at: Option<String>,

    /// Older clients send `date`
    pub date: Option<String>,
}

/// Transaction list filters
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub start: Option<String>,
    pub end: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ListTransactionsQuery {
    fn filter(&self) -> ApiResult<TransactionFilter> {
        let (start, end) = PeriodQuery {
            start: self.start.clone(),
            end: self.end.clone(),
        }
        .bounds()?;

        let kind = match self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            None => None,
            Some(raw) => Some(
                TransactionType::parse(raw).ok_or_else(|| ApiError::invalid_field("type", TYPE_MESSAGE))?,
            ),
        };

        Ok(TransactionFilter { start, end, kind })
    }
}

/// Created transaction plus refreshed company totals
#[derive(Debug, Serialize)]
pub struct CreateTransactionResponse {
    pub transaction: FinancialTransaction,

    #[serde(flatten)]
    pub totals: FinanceTotals,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    ApiJson(req): ApiJson<CreateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<CreateTransactionResponse>)> {
    req.validate()?;

    let kind = TransactionType::parse(&req.kind)
        .ok_or_else(|| ApiError::invalid_field("type", TYPE_MESSAGE))?;

    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::invalid_field(
            "description",
            "Descricao deve ter entre 1 e 255 caracteres",
        ));
    }

    let raw_date = req
        .occurred_at
        .as_deref()
        .or(req.date.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let occurred_at = match raw_date {
        None => Utc::now(),
        Some(raw) => parse_instant(raw)
            .ok_or_else(|| ApiError::invalid_field("occurredAt", DATE_MESSAGE))?,
    };

    let category = req
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let transaction = FinancialTransaction::create(
        &state.db,
        CreateTransaction {
            company_id,
            user_id: Some(auth.user_id),
            kind,
            amount: req.amount,
            description,
            category,
            occurred_at,
        },
    )
    .await?;

    let totals = FinanceTotals::from(FinancialTransaction::sums(&state.db, company_id).await?);

    tracing::info!(
        transaction_id = %transaction.id,
        company_id = %company_id,
        kind = kind.as_str(),
        "Transaction recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateTransactionResponse {
            transaction,
            totals,
        }),
    ))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<Vec<FinancialTransaction>>> {
    let transactions = FinancialTransaction::list(&state.db, company_id, &query.filter()?).await?;
    Ok(Json(transactions))
}

/// Lists transactions for the company named in the path
///
/// The tenant guard has already rejected a path id that differs from the
/// token's company; this also requires it to be the active company.
pub async fn list_company_transactions(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Path(path_company): Path<String>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<Vec<FinancialTransaction>>> {
    let requested = path_company.trim();
    if requested.is_empty() {
        return Err(ApiError::BadRequest("companyId nao informado".to_string()));
    }
    if uuid::Uuid::parse_str(requested).ok() != Some(company_id) {
        return Err(ApiError::BadRequest(
            "companyId nao corresponde ao usuario autenticado".to_string(),
        ));
    }

    let transactions = FinancialTransaction::list(&state.db, company_id, &query.filter()?).await?;
    Ok(Json(transactions))
}

/// Lists transactions of the user's primary company; empty without one
pub async fn list_user_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<Vec<FinancialTransaction>>> {
    let filter = query.filter()?;

    let company_id = User::find_by_id(&state.db, auth.user_id)
        .await?
        .and_then(|user| user.company_id);

    let Some(company_id) = company_id else {
        return Ok(Json(Vec::new()));
    };

    let transactions = FinancialTransaction::list(&state.db, company_id, &filter).await?;
    Ok(Json(transactions))
}

pub async fn summary(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(company_summary(&state, company_id).await?))
}

pub async fn report(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<FinanceReport>> {
    let transactions = FinancialTransaction::list(&state.db, company_id, &query.filter()?).await?;
    Ok(Json(FinanceReport::build(&transactions)))
}
